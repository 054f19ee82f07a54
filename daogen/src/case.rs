//! Identifier case transforms shared by schema introspection and code emission.
//!
//! All transforms work on Unicode scalar values and never consult the locale.

use unicode_general_category::{GeneralCategory, get_general_category};

/// `user_id` -> `userId`. The first segment is lowercased entirely.
pub fn lower_camel_case(ident: &str) -> String {
    let mut result = String::with_capacity(ident.len());
    for (i, segment) in ident.split('_').enumerate() {
        if i == 0 {
            result.push_str(&segment.to_lowercase());
        } else {
            result.push_str(&title_case(segment));
        }
    }
    result
}

/// `user_id` -> `UserId`. Empty segments from repeated underscores are skipped.
pub fn upper_camel_case(ident: &str) -> String {
    ident
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(title_case)
        .collect()
}

/// Upper-cases the first letter of every letter run and lower-cases the rest.
///
/// Letters are the Unicode `L*` categories. Everything else, including letter
/// numbers such as `ⅻ` and combining marks, is copied unchanged and starts a
/// new word, so `"3d_mODEL"` becomes `"3D_Model"`.
pub fn title_case(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut word_start = true;
    for ch in word.chars() {
        if is_letter(ch) {
            if word_start {
                result.extend(ch.to_uppercase());
                word_start = false;
            } else {
                result.extend(ch.to_lowercase());
            }
        } else {
            result.push(ch);
            word_start = true;
        }
    }
    result
}

fn is_letter(ch: char) -> bool {
    matches!(
        get_general_category(ch),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}
