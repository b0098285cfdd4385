//! Slug derivation for clan names
//!
//! A slug is the lowercase, URL-safe identifier derived from a clan's name.
//! Cyrillic is transliterated with the common web mapping before any
//! non-alphanumeric run collapses to a single dash. Recomputed on every
//! rename; uniqueness is checked against the collection by the caller.

/// Transliterate a single Cyrillic character, pass everything else through.
///
/// Hard and soft signs are dropped entirely.
fn transliterate_char(c: char) -> Option<&'static str> {
    Some(match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    })
}

/// Derive a URL-safe slug from a clan name.
///
/// Returns an empty string when the name holds no transliterable
/// alphanumerics; callers treat that as a validation failure.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        let mapped = match transliterate_char(c) {
            Some(s) => s,
            None if c.is_ascii_alphanumeric() => {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c);
                continue;
            }
            None => {
                pending_dash = true;
                continue;
            }
        };

        if mapped.is_empty() {
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push_str(mapped);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_name() {
        assert_eq!(slugify("Hikers"), "hikers");
    }

    #[test]
    fn test_spaces_collapse_to_dash() {
        assert_eq!(slugify("Night  City Runners"), "night-city-runners");
    }

    #[test]
    fn test_cyrillic_transliteration() {
        assert_eq!(slugify("Сибирские волки"), "sibirskie-volki");
        assert_eq!(slugify("Щука"), "shchuka");
        assert_eq!(slugify("Ёжик в тумане"), "yozhik-v-tumane");
    }

    #[test]
    fn test_soft_and_hard_signs_dropped() {
        assert_eq!(slugify("Объектив"), "obektiv");
        assert_eq!(slugify("Рысь"), "rys");
    }

    #[test]
    fn test_punctuation_trimmed() {
        assert_eq!(slugify("  ...Горный клуб!!!  "), "gornyy-klub");
    }

    #[test]
    fn test_mixed_scripts_and_digits() {
        assert_eq!(slugify("Клуб 4x4 Байкал"), "klub-4x4-baykal");
    }

    #[test]
    fn test_untransliterable_name_is_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("日本語"), "");
    }
}
