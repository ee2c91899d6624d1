//! Named-tag conversions for bitmask types
//!
//! Configuration and fixtures spell rights and actions as tags such as
//! `GenericRead` or `AddAccessRule`. Matching ignores case, `_` and `-`, so
//! the `bitflags` constant `GENERIC_READ` answers to `GenericRead`,
//! `generic_read` and `generic-read` alike.

use crate::error::{AdAclError, Result};
use bitflags::Flags;

fn normalize(tag: &str) -> String {
    tag.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let mut word = first.to_ascii_uppercase().to_string();
                    word.push_str(&chars.as_str().to_ascii_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Parse a single tag into its flag value.
pub fn parse_tag<F: Flags + Copy>(kind: &'static str, tag: &str) -> Result<F> {
    let wanted = normalize(tag);
    F::FLAGS
        .iter()
        .find(|flag| normalize(flag.name()) == wanted)
        .map(|flag| *flag.value())
        .ok_or_else(|| AdAclError::UnknownTag {
            kind,
            tag: tag.to_string(),
        })
}

/// Parse and union a list of tags.
pub fn parse_tags<F, I, S>(kind: &'static str, tags: I) -> Result<F>
where
    F: Flags + Copy,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flags = F::empty();
    for tag in tags {
        flags.insert(parse_tag::<F>(kind, tag.as_ref())?);
    }
    Ok(flags)
}

/// Tag names covering `flags`, composite names first in declaration order.
pub fn tag_names<F: Flags>(flags: &F) -> Vec<String> {
    flags
        .iter_names()
        .map(|(name, _)| pascal_case(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ignores_case_and_separators() {
        assert_eq!(normalize("GenericRead"), "genericread");
        assert_eq!(normalize("GENERIC_READ"), "genericread");
        assert_eq!(normalize("generic-read"), "genericread");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("GENERIC_READ"), "GenericRead");
        assert_eq!(pascal_case("SELF"), "Self");
        assert_eq!(pascal_case("ACCESS_SYSTEM_SECURITY"), "AccessSystemSecurity");
    }
}
