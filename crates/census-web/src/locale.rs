//! `Accept-Language` negotiation.
//!
//! The `lang` cookie override is applied later by the request-context
//! pipeline; this is only the header-based fallback.

/// Pick the best configured locale for an `Accept-Language` header.
///
/// Ranges are tried in descending `q` order (header order breaks ties).
/// A range matches a locale exactly or by primary subtag (`fr-CA`
/// matches `fr`). Falls back to the first configured locale, then `en`.
pub fn negotiate(accept_language: Option<&str>, available: &[String]) -> String {
    let fallback = available.first().map_or("en", String::as_str).to_owned();
    let Some(header) = accept_language else {
        return fallback;
    };

    let mut ranges: Vec<(&str, u16)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .map_or(1000, parse_quality);
            Some((tag, quality))
        })
        .filter(|(_, quality)| *quality > 0)
        .collect();
    ranges.sort_by(|a, b| b.1.cmp(&a.1));

    for (tag, _) in ranges {
        if tag == "*" {
            return fallback;
        }
        let primary = tag.split('-').next().unwrap_or(tag);
        let found = available
            .iter()
            .find(|locale| locale.eq_ignore_ascii_case(tag))
            .or_else(|| {
                available
                    .iter()
                    .find(|locale| locale.eq_ignore_ascii_case(primary))
            });
        if let Some(locale) = found {
            return locale.clone();
        }
    }
    fallback
}

/// `q` value in thousandths; unparsable values count as 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_quality(raw: &str) -> u16 {
    raw.trim()
        .parse::<f64>()
        .map_or(0, |q| (q.clamp(0.0, 1.0) * 1000.0).round() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn no_header_uses_first_locale() {
        assert_eq!(negotiate(None, &locales(&["de", "en"])), "de");
        assert_eq!(negotiate(None, &[]), "en");
    }

    #[test]
    fn highest_quality_match_wins() {
        let available = locales(&["en", "fr", "es"]);
        assert_eq!(negotiate(Some("es;q=0.5, fr;q=0.9"), &available), "fr");
    }

    #[test]
    fn region_falls_back_to_primary_subtag() {
        let available = locales(&["en", "fr"]);
        assert_eq!(negotiate(Some("fr-CA,fr;q=0.8"), &available), "fr");
    }

    #[test]
    fn unsupported_languages_fall_back() {
        let available = locales(&["en", "fr"]);
        assert_eq!(negotiate(Some("ja, zh;q=0.5"), &available), "en");
        assert_eq!(negotiate(Some("fr;q=0"), &available), "en");
    }
}
