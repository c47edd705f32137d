/// Location factor when the requested and listed locations are the same
pub const EXACT_LOCATION_SCORE: f64 = 1.0;
/// Location factor when the locations share a region (city, state, borough)
pub const REGION_LOCATION_SCORE: f64 = 0.5;
/// Location factor for everything else; a soft penalty, never an exclusion
pub const DISTANT_LOCATION_SCORE: f64 = 0.1;

/// How close a surgeon's listed location is to the requested one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    Exact,
    SameRegion,
    Distant,
}

impl Proximity {
    #[inline]
    pub fn score(&self) -> f64 {
        match self {
            Proximity::Exact => EXACT_LOCATION_SCORE,
            Proximity::SameRegion => REGION_LOCATION_SCORE,
            Proximity::Distant => DISTANT_LOCATION_SCORE,
        }
    }
}

/// Split a free-form location into its region segments
///
/// "Brooklyn, New York" -> [["brooklyn"], ["new", "york"]]
pub fn region_segments(location: &str) -> Vec<Vec<String>> {
    location
        .split(|c| matches!(c, ',' | '/' | '|' | ';' | '-'))
        .map(|segment| {
            segment
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| !word.is_empty())
                .map(|word| word.to_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|words| !words.is_empty())
        .collect()
}

/// True when `needle` appears as a contiguous run of words inside `haystack`
#[inline]
fn contains_words(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Compare a requested location with a surgeon's listed location
///
/// Exact means equal after case and whitespace folding. Two locations share
/// a region when some segment of one appears word-for-word inside a segment
/// of the other, so "New York" and "Manhattan, New York City" share a region
/// but "New York" and "New Orleans" do not.
pub fn proximity(requested: &str, listed: &str) -> Proximity {
    let requested_words: Vec<Vec<String>> = region_segments(requested);
    let listed_words: Vec<Vec<String>> = region_segments(listed);

    if requested_words.is_empty() || listed_words.is_empty() {
        return Proximity::Distant;
    }

    if requested_words.concat() == listed_words.concat() {
        return Proximity::Exact;
    }

    let shares_region = requested_words.iter().any(|a| {
        listed_words
            .iter()
            .any(|b| contains_words(a, b) || contains_words(b, a))
    });

    if shares_region {
        Proximity::SameRegion
    } else {
        Proximity::Distant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_location_ignores_case() {
        assert_eq!(proximity("NYC", "nyc"), Proximity::Exact);
        assert_eq!(proximity("New York,  NY", "new york, ny"), Proximity::Exact);
    }

    #[test]
    fn test_shared_region() {
        assert_eq!(proximity("Brooklyn, NY", "Manhattan, NY"), Proximity::SameRegion);
        assert_eq!(proximity("New York", "New York City"), Proximity::SameRegion);
        assert_eq!(proximity("Miami", "Miami Beach, FL"), Proximity::SameRegion);
    }

    #[test]
    fn test_unrelated_locations_are_distant() {
        assert_eq!(proximity("NYC", "Boston"), Proximity::Distant);
        assert_eq!(proximity("New York", "New Orleans"), Proximity::Distant);
        assert_eq!(proximity("NY", "Sunnyvale, CA"), Proximity::Distant);
    }

    #[test]
    fn test_missing_location_is_distant() {
        assert_eq!(proximity("NYC", ""), Proximity::Distant);
        assert_eq!(proximity("NYC", " , "), Proximity::Distant);
    }

    #[test]
    fn test_scores() {
        assert_eq!(Proximity::Exact.score(), 1.0);
        assert_eq!(Proximity::SameRegion.score(), 0.5);
        assert_eq!(Proximity::Distant.score(), 0.1);
    }
}
