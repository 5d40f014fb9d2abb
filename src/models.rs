use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of catalog entry. TMDB uses the same lowercase names in paths and
/// in multi-search payloads, so the serde names double as path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(anyhow::anyhow!("unknown media type '{}'", other)),
        }
    }
}

/// One row of a listing or search feed, normalized across the movie and tv
/// response shapes (`title`/`release_date` vs `name`/`first_air_date`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: f64,
    pub media_type: MediaType,
    pub release_date: Option<String>,
}

/// A user-curated bookmark, uniquely keyed by (id, media_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl SavedItem {
    pub fn matches(&self, id: i64, media_type: MediaType) -> bool {
        self.id == id && self.media_type == media_type
    }
}

/// Entry in the home-page trailer rail.
#[derive(Debug, Clone, Serialize)]
pub struct TrailerCard {
    pub id: i64,
    pub title: String,
    pub key: String,
    pub backdrop_path: Option<String>,
    pub media_type: MediaType,
    pub overview: String,
    pub vote_average: f64,
    pub release_date: Option<String>,
}

/// Per-section fetch outcome. Sections of a page load independently, so one
/// failed feed carries its error without poisoning the others.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Section<T> {
    Loaded { results: Vec<T> },
    Failed { error: String },
}

impl<T> Section<T> {
    pub fn from_result(result: anyhow::Result<Vec<T>>) -> Self {
        match result {
            Ok(results) => Section::Loaded { results },
            Err(err) => Section::Failed {
                error: format!("{err:#}"),
            },
        }
    }

    pub fn results(&self) -> Option<&[T]> {
        match self {
            Section::Loaded { results } => Some(results),
            Section::Failed { .. } => None,
        }
    }
}

/// Aggregated payload for the landing page.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub trailers: Section<TrailerCard>,
    pub now_playing: Section<MediaSummary>,
    pub on_the_air: Section<MediaSummary>,
    pub popular_series: Section<MediaSummary>,
    pub top_rated_series: Section<MediaSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_round_trips_through_str() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("book".parse::<MediaType>().is_err());
        assert_eq!(MediaType::Tv.as_str(), "tv");
    }

    #[test]
    fn media_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MediaType::Movie).unwrap(),
            "\"movie\""
        );
        let parsed: MediaType = serde_json::from_str("\"tv\"").unwrap();
        assert_eq!(parsed, MediaType::Tv);
    }

    #[test]
    fn section_tags_status() {
        let loaded: Section<i32> = Section::from_result(Ok(vec![1, 2]));
        let value = serde_json::to_value(&loaded).unwrap();
        assert_eq!(value["status"], "loaded");
        assert_eq!(value["results"].as_array().unwrap().len(), 2);

        let failed: Section<i32> = Section::from_result(Err(anyhow::anyhow!("boom")));
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
    }
}
