use crate::{LayerError, NameKind, Result};

/// Names must be strictly shorter than this.
pub const MAX_NAME_LENGTH: usize = 100;

/// Prefix for mailboxes created without an explicit one
pub const DEFAULT_CHANNEL_PREFIX: &str = "specific";

const PROCESS_SPECIFIC_MARKER: char = '!';

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Channel names are `body` or `body!suffix`, where the body is non-empty.
/// The suffix may be empty, which is how receivers address the non-local part.
pub fn validate_channel_name(name: &str) -> Result<()> {
    if name.len() >= MAX_NAME_LENGTH {
        return Err(LayerError::invalid_name(NameKind::Channel, name));
    }

    let (body, suffix) = match name.split_once(PROCESS_SPECIFIC_MARKER) {
        Some((body, suffix)) => (body, suffix),
        None => (name, ""),
    };

    if body.is_empty() || !body.chars().all(is_name_char) || !suffix.chars().all(is_name_char) {
        return Err(LayerError::invalid_name(NameKind::Channel, name));
    }

    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_NAME_LENGTH || !name.chars().all(is_name_char) {
        return Err(LayerError::invalid_name(NameKind::Group, name));
    }
    Ok(())
}

/// The part of a process-specific name up to and including the `!`; the
/// whole name for ordinary channels.
pub fn non_local_name(name: &str) -> &str {
    match name.find(PROCESS_SPECIFIC_MARKER) {
        Some(index) => &name[..=index],
        None => name,
    }
}

pub fn is_process_specific(name: &str) -> bool {
    name.contains(PROCESS_SPECIFIC_MARKER)
}
