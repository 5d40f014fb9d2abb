use crate::config::Config;
use crate::models::{MediaSummary, MediaType};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";

/// Listing feeds consumed by the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    NowPlayingMovies,
    UpcomingMovies,
    TopRatedMovies,
    PopularMovies,
    OnTheAirSeries,
    PopularSeries,
    TopRatedSeries,
}

impl Listing {
    pub fn path(self) -> &'static str {
        match self {
            Listing::NowPlayingMovies => "movie/now_playing",
            Listing::UpcomingMovies => "movie/upcoming",
            Listing::TopRatedMovies => "movie/top_rated",
            Listing::PopularMovies => "movie/popular",
            Listing::OnTheAirSeries => "tv/on_the_air",
            Listing::PopularSeries => "tv/popular",
            Listing::TopRatedSeries => "tv/top_rated",
        }
    }

    pub fn media_type(self) -> MediaType {
        match self {
            Listing::NowPlayingMovies
            | Listing::UpcomingMovies
            | Listing::TopRatedMovies
            | Listing::PopularMovies => MediaType::Movie,
            Listing::OnTheAirSeries | Listing::PopularSeries | Listing::TopRatedSeries => {
                MediaType::Tv
            }
        }
    }

    // Only the movie feeds behind the trailer rail carry a region filter.
    fn regional(self) -> bool {
        matches!(
            self,
            Listing::UpcomingMovies | Listing::TopRatedMovies | Listing::PopularMovies
        )
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn listing(&self, list: Listing, page: u32) -> Result<Vec<MediaSummary>>;
    async fn search(&self, media: MediaType, query: &str) -> Result<Vec<MediaSummary>>;
    async fn movie_detail(&self, id: i64) -> Result<MovieDetail>;
    async fn tv_detail(&self, id: i64) -> Result<TvDetail>;
    async fn videos(&self, media: MediaType, id: i64) -> Result<Vec<Video>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base: String,
    api_key: String,
    primary_locale: String,
    fallback_locale: String,
    region: String,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base: TMDB_BASE.to_string(),
            api_key: config.api_key.clone(),
            primary_locale: config.primary_locale.clone(),
            fallback_locale: config.fallback_locale.clone(),
            region: config.region.clone(),
        }
    }

    /// Point the client at a different provider base URL (tests).
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str, params: &[(&str, &str)], language: &str) -> String {
        let mut url = format!(
            "{}/{}?api_key={}&language={}",
            self.base, path, self.api_key, language
        );
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let res = self.client.get(url).send().await.context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }

    async fn get_localized<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        language: &str,
    ) -> Result<T> {
        let url = self.url(path, params, language);
        self.get_json(&url).await
    }

    /// Collection endpoints: request in the primary locale; on an empty
    /// `results` or any failure, reissue once in the fallback locale and
    /// return that outcome, empty included. The fallback is never retried.
    async fn page_with_fallback<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned + ResultsPage,
    {
        match self.get_localized::<T>(path, params, &self.primary_locale).await {
            Ok(page) if !page.is_empty() => Ok(page),
            Ok(_) => {
                debug!(
                    "{}: no {} results, retrying in {}",
                    path, self.primary_locale, self.fallback_locale
                );
                self.get_localized(path, params, &self.fallback_locale).await
            }
            Err(err) => {
                debug!(
                    "{}: {} request failed ({:#}), retrying in {}",
                    path, self.primary_locale, err, self.fallback_locale
                );
                self.get_localized(path, params, &self.fallback_locale).await
            }
        }
    }

    /// Flat detail endpoints have no `results` collection to judge, so the
    /// fallback locale is tried on request failure only.
    async fn detail_with_fallback<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        match self.get_localized::<T>(path, &[], &self.primary_locale).await {
            Ok(detail) => Ok(detail),
            Err(err) => {
                debug!(
                    "{}: {} request failed ({:#}), retrying in {}",
                    path, self.primary_locale, err, self.fallback_locale
                );
                self.get_localized(path, &[], &self.fallback_locale).await
            }
        }
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn listing(&self, list: Listing, page: u32) -> Result<Vec<MediaSummary>> {
        let page_param = page.to_string();
        let mut params = vec![("page", page_param.as_str())];
        if list.regional() {
            params.push(("region", self.region.as_str()));
        }
        let listing: ListingPage = self.page_with_fallback(list.path(), &params).await?;
        Ok(normalize(listing.results, list.media_type()))
    }

    async fn search(&self, media: MediaType, query: &str) -> Result<Vec<MediaSummary>> {
        let path = format!("search/{}", media.as_str());
        let params = [("query", query), ("page", "1")];
        let listing: ListingPage = self.page_with_fallback(&path, &params).await?;
        Ok(normalize(listing.results, media))
    }

    async fn movie_detail(&self, id: i64) -> Result<MovieDetail> {
        self.detail_with_fallback(&format!("movie/{id}")).await
    }

    async fn tv_detail(&self, id: i64) -> Result<TvDetail> {
        self.detail_with_fallback(&format!("tv/{id}")).await
    }

    async fn videos(&self, media: MediaType, id: i64) -> Result<Vec<Video>> {
        let path = format!("{}/{}/videos", media.as_str(), id);
        let page: VideosPage = self.page_with_fallback(&path, &[]).await?;
        Ok(page.results)
    }
}

trait ResultsPage {
    fn is_empty(&self) -> bool;
}

// A missing or malformed `results` field deserializes as empty rather than
// failing the request.
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    results: Vec<RawSummary>,
}

impl ResultsPage for ListingPage {
    fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct VideosPage {
    #[serde(default)]
    results: Vec<Video>,
}

impl ResultsPage for VideosPage {
    fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

impl RawSummary {
    fn into_summary(self, media_type: MediaType) -> MediaSummary {
        let title = self.title.or(self.name).unwrap_or_default();
        let release_date = match media_type {
            MediaType::Movie => self.release_date.or(self.first_air_date),
            MediaType::Tv => self.first_air_date.or(self.release_date),
        };
        MediaSummary {
            id: self.id,
            title,
            overview: self.overview,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            vote_average: self.vote_average,
            media_type,
            release_date,
        }
    }
}

fn normalize(rows: Vec<RawSummary>, media_type: MediaType) -> Vec<MediaSummary> {
    rows.into_iter()
        .map(|row| row.into_summary(media_type))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    pub release_date: Option<String>,
    pub runtime: Option<i64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub popularity: f64,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub number_of_seasons: u32,
    #[serde(default)]
    pub number_of_episodes: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub key: String,
}

/// First YouTube-hosted trailer, if any.
pub fn youtube_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == "Trailer")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawSummary {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn normalizes_movie_rows() {
        let summary = raw(serde_json::json!({
            "id": 42,
            "title": "X",
            "overview": "plot",
            "poster_path": "/x.jpg",
            "vote_average": 7.5,
            "release_date": "2024-03-01"
        }))
        .into_summary(MediaType::Movie);
        assert_eq!(summary.id, 42);
        assert_eq!(summary.title, "X");
        assert_eq!(summary.media_type, MediaType::Movie);
        assert_eq!(summary.release_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn normalizes_tv_rows() {
        let summary = raw(serde_json::json!({
            "id": 7,
            "name": "Show",
            "first_air_date": "2023-10-10"
        }))
        .into_summary(MediaType::Tv);
        assert_eq!(summary.title, "Show");
        assert_eq!(summary.release_date.as_deref(), Some("2023-10-10"));
        assert_eq!(summary.vote_average, 0.0);
        assert!(summary.poster_path.is_none());
    }

    #[test]
    fn missing_results_field_parses_as_empty() {
        let page: ListingPage = serde_json::from_str("{\"page\": 1}").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn trailer_selection_prefers_youtube_trailer() {
        let videos = vec![
            Video {
                site: "Vimeo".to_string(),
                video_type: "Trailer".to_string(),
                key: "v1".to_string(),
            },
            Video {
                site: "YouTube".to_string(),
                video_type: "Teaser".to_string(),
                key: "v2".to_string(),
            },
            Video {
                site: "YouTube".to_string(),
                video_type: "Trailer".to_string(),
                key: "v3".to_string(),
            },
        ];
        assert_eq!(youtube_trailer(&videos).map(|v| v.key.as_str()), Some("v3"));
        assert!(youtube_trailer(&videos[..2]).is_none());
    }
}
