pub mod extractor;

pub use extractor::{ArchiveExtractor, ExtractedMember, ExtractionStats};

use crate::utils::constants::MEMBER_SUFFIX;

/// Station id encoded in a member name such as `USC00048829.csv`.
pub fn station_id_from_member(member_name: &str) -> Option<&str> {
    let file_name = member_name.rsplit('/').next()?;
    file_name
        .strip_suffix(MEMBER_SUFFIX)
        .filter(|id| !id.is_empty())
}
