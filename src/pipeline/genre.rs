//! Free-text genre classification onto the fixed taxonomy.
//!
//! Two passes: alias unification (so "hip hop", "hiphop" and "hip_hop" all
//! become "hip-hop"), then keyword containment against ordered groups where
//! the first matching group wins. Anything unmatched, including nulls, is
//! `Other`.

use crate::table::{MainGenre, TrackTable};
use tracing::debug;

/// Spelling variants unified before classification.
const GENRE_ALIASES: &[(&str, &str)] = &[
    ("hip hop", "hip-hop"),
    ("hiphop", "hip-hop"),
    ("hip_hop", "hip-hop"),
    ("edm", "electronic"),
    ("electronic dance music", "electronic"),
    ("r&b", "r-n-b"),
    ("rnb", "r-n-b"),
    ("r and b", "r-n-b"),
];

/// Keyword groups in priority order; the first group containing a matching
/// keyword decides the main genre.
const KEYWORD_GROUPS: &[(MainGenre, &[&str])] = &[
    (
        MainGenre::Pop,
        &["pop", "dance-pop", "electropop", "synthpop"],
    ),
    (
        MainGenre::Rock,
        &["rock", "indie", "alternative", "hard-rock", "metal", "alt-rock"],
    ),
    (MainGenre::HipHop, &["hip-hop", "rap", "trap"]),
    (
        MainGenre::Electronic,
        &["electronic", "house", "techno", "dubstep", "trance"],
    ),
    (MainGenre::RnB, &["r-n-b", "soul", "neo-soul"]),
    (MainGenre::Country, &["country", "folk", "americana"]),
    (
        MainGenre::Latin,
        &["latin", "reggaeton", "salsa", "bachata"],
    ),
    (MainGenre::Jazz, &["jazz", "blues"]),
    (
        MainGenre::Classical,
        &["classical", "soundtrack", "instrumental"],
    ),
];

/// Lowercase, trim, and unify known aliases.
pub fn clean_genre(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    for (alias, unified) in GENRE_ALIASES {
        if cleaned == *alias {
            return (*unified).to_string();
        }
    }
    cleaned
}

/// Classify a cleaned genre string into the taxonomy.
pub fn classify(genre_clean: Option<&str>) -> MainGenre {
    let Some(genre) = genre_clean else {
        return MainGenre::Other;
    };
    let genre = genre.to_lowercase();
    for (main, keywords) in KEYWORD_GROUPS {
        if keywords.iter().any(|keyword| genre.contains(keyword)) {
            return *main;
        }
    }
    MainGenre::Other
}

/// Populate `genre_clean` and `main_genre` for every row in the table.
pub fn classify_table(table: &mut TrackTable) {
    for row in &mut table.rows {
        row.genre_clean = row.genre.as_deref().map(clean_genre);
        row.main_genre = Some(classify(row.genre_clean.as_deref()));
    }
    debug!(source = %table.source, rows = table.len(), "classified genres");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableSchema, TrackRecord};

    #[test]
    fn test_alias_unification() {
        assert_eq!(clean_genre("Hip Hop"), "hip-hop");
        assert_eq!(clean_genre("hiphop"), "hip-hop");
        assert_eq!(clean_genre("hip_hop"), "hip-hop");
        assert_eq!(clean_genre("EDM"), "electronic");
        assert_eq!(clean_genre("R&B"), "r-n-b");
        assert_eq!(clean_genre("r and b"), "r-n-b");
        assert_eq!(clean_genre("  Jazz  "), "jazz");
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(classify(Some("hip-hop")), MainGenre::HipHop);
        assert_eq!(classify(Some("dance-pop")), MainGenre::Pop);
        assert_eq!(classify(Some("hard-rock")), MainGenre::Rock);
        assert_eq!(classify(Some("deep house")), MainGenre::Electronic);
        assert_eq!(classify(Some("neo-soul")), MainGenre::RnB);
        assert_eq!(classify(Some("americana")), MainGenre::Country);
        assert_eq!(classify(Some("reggaeton")), MainGenre::Latin);
        assert_eq!(classify(Some("delta blues")), MainGenre::Jazz);
        // "symphony no.5" carries no keyword by itself, but typical
        // classical labels do
        assert_eq!(classify(Some("classical symphony no.5")), MainGenre::Classical);
        assert_eq!(classify(Some("instrumental")), MainGenre::Classical);
    }

    #[test]
    fn test_first_matching_group_wins() {
        // "pop" group outranks "rock" even though both match
        assert_eq!(classify(Some("pop rock")), MainGenre::Pop);
    }

    #[test]
    fn test_unmatched_and_null_are_other() {
        assert_eq!(classify(Some("ambient noise collage")), MainGenre::Other);
        assert_eq!(classify(None), MainGenre::Other);
        assert_eq!(classify(Some("unknown")), MainGenre::Other);
    }

    #[test]
    fn test_classify_table_end_to_end() {
        let mut table = TrackTable::new(
            "test",
            TableSchema {
                has_genre: true,
                ..Default::default()
            },
        );
        table.rows = vec![
            TrackRecord {
                genre: Some("hip hop".into()),
                ..Default::default()
            },
            TrackRecord {
                genre: None,
                ..Default::default()
            },
        ];

        classify_table(&mut table);

        assert_eq!(table.rows[0].genre_clean.as_deref(), Some("hip-hop"));
        assert_eq!(table.rows[0].main_genre, Some(MainGenre::HipHop));
        assert_eq!(table.rows[1].main_genre, Some(MainGenre::Other));
    }
}
