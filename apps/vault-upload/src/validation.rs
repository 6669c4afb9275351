//! Input validation for vault names, archive descriptions and sizes

use crate::slicing::{MAX_PART_SIZE_MIB, MIN_PART_SIZE_MIB};
use crate::MIB;

/// Longest vault name the service accepts
pub const MAX_VAULT_NAME_LEN: usize = 255;

/// Longest archive description the service accepts
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Largest payload accepted by a single-request upload: 4 GiB
pub const MAX_SINGLE_UPLOAD_SIZE: u64 = 4096 * MIB;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid vault name {name:?}: {reason}")]
    VaultName { name: String, reason: &'static str },

    #[error("Invalid archive description: {0}")]
    Description(&'static str),

    #[error("Invalid part size: {0} bytes (must be a power of two between 1 MiB and 4 GiB)")]
    PartSize(u64),

    #[error("Payload too large for a single upload: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: u64 },
}

/// Vault names are 1-255 characters of `a-z`, `A-Z`, `0-9`, `_`, `-` and `.`
pub fn validate_vault_name(name: &str) -> Result<(), ValidationError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_VAULT_NAME_LEN {
        Some("must be at most 255 characters")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        Some("may only contain letters, digits, '_', '-' and '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::VaultName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Descriptions are at most 1024 printable ASCII characters
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::Description("longer than 1024 characters"));
    }
    if !description.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(ValidationError::Description(
            "contains characters outside printable ASCII",
        ));
    }
    Ok(())
}

pub fn validate_part_size(part_size_bytes: u64) -> Result<(), ValidationError> {
    let valid = part_size_bytes % MIB == 0
        && (part_size_bytes / MIB).is_power_of_two()
        && (MIN_PART_SIZE_MIB..=MAX_PART_SIZE_MIB).contains(&(part_size_bytes / MIB));

    if valid {
        Ok(())
    } else {
        Err(ValidationError::PartSize(part_size_bytes))
    }
}

pub fn validate_single_upload_size(size: u64) -> Result<(), ValidationError> {
    if size > MAX_SINGLE_UPLOAD_SIZE {
        return Err(ValidationError::PayloadTooLarge {
            size,
            max: MAX_SINGLE_UPLOAD_SIZE,
        });
    }
    Ok(())
}
