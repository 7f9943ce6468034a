//! Shared fixtures for end-to-end pipeline tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Writes a CSV source file into the temp dir and returns its path.
pub fn write_source(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// A 60s-labeled export in the `track`/`artist`/`uri` header dialect,
/// including one duplicate row and one out-of-range loudness row.
pub fn sixties_source(dir: &TempDir) -> PathBuf {
    write_source(
        dir,
        "dataset-of-60s.csv",
        "track,artist,uri,danceability,energy,loudness,tempo,year,genre\n\
         Twist Again,Chubby C,spotify:track:s1,0.7,0.8,-6.0,140.0,1961,rock and roll\n\
         Twist Again,Chubby C,spotify:track:s1,0.7,0.8,-6.0,140.0,1961,rock and roll\n\
         Blue Mood,Misty Trio,spotify:track:s2,0.3,0.2,-18.0,85.0,1964,jazz\n\
         Broken Row,Bad Export,spotify:track:s3,0.5,0.6,-75.0,120.0,1966,pop\n",
    )
}

/// A 90s-labeled export sharing one track id with the generic source.
pub fn nineties_source(dir: &TempDir) -> PathBuf {
    write_source(
        dir,
        "dataset-of-90s.csv",
        "track,artist,uri,danceability,energy,loudness,tempo,year,genre\n\
         Big Beat,MC Sample,spotify:track:x1,0.9,0.9,-4.0,95.0,1994,hip hop\n\
         Quiet Song,Soft Band,spotify:track:x2,0.4,0.3,-25.0,70.0,1997,folk\n",
    )
}

/// A generic modern export with a real `track_id` column. Its identifiers use
/// the same uri form the decade exports carry, so `spotify:track:x1` names the
/// same track as the 90s export's uri.
pub fn modern_source(dir: &TempDir) -> PathBuf {
    write_source(
        dir,
        "spotify_data.csv",
        "track_id,track_name,artist_name,energy,loudness,year,genre\n\
         spotify:track:x1,Big Beat,MC Sample,0.7,-5.0,1996,rap\n\
         spotify:track:m1,Neon Nights,Synth Duo,0.85,-16.0,2012,edm\n\
         spotify:track:m2,Slow Waves,Calm Quartet,0.15,-10.0,2015,classical\n",
    )
}
