use crate::models::{HomePage, MediaSummary, MediaType, Section, TrailerCard};
use crate::tmdb::{youtube_trailer, Listing, MovieDetail, TmdbApi, TvDetail};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

// Rail sizes are presentation choices, kept in one place.
pub const NOW_PLAYING_LIMIT: usize = 30;
pub const SERIES_RAIL_LIMIT: usize = 15;
pub const TRAILER_SOURCE_LIMIT: usize = 30;
pub const TRAILER_RAIL_LIMIT: usize = 20;

/// Landing page: every rail loads concurrently and fails independently.
pub async fn home(tmdb: &Arc<dyn TmdbApi>) -> HomePage {
    let (now_playing, on_the_air, popular, top_rated, trailers) = tokio::join!(
        rail(tmdb, Listing::NowPlayingMovies, NOW_PLAYING_LIMIT),
        rail(tmdb, Listing::OnTheAirSeries, SERIES_RAIL_LIMIT),
        rail(tmdb, Listing::PopularSeries, SERIES_RAIL_LIMIT),
        rail(tmdb, Listing::TopRatedSeries, SERIES_RAIL_LIMIT),
        latest_trailers(tmdb),
    );
    HomePage {
        trailers: Section::from_result(trailers),
        now_playing: Section::from_result(now_playing),
        on_the_air: Section::from_result(on_the_air),
        popular_series: Section::from_result(popular),
        top_rated_series: Section::from_result(top_rated),
    }
}

async fn rail(tmdb: &Arc<dyn TmdbApi>, list: Listing, limit: usize) -> Result<Vec<MediaSummary>> {
    let mut results = tmdb.listing(list, 1).await?;
    results.truncate(limit);
    Ok(results)
}

/// Trailer rail: union of the fresh movie feeds and on-the-air series,
/// deduplicated, then resolved to each entry's first YouTube trailer.
/// Entries whose video lookup fails are dropped rather than failing the rail.
pub async fn latest_trailers(tmdb: &Arc<dyn TmdbApi>) -> Result<Vec<TrailerCard>> {
    let (upcoming, top_rated, popular, on_the_air) = tokio::try_join!(
        tmdb.listing(Listing::UpcomingMovies, 1),
        tmdb.listing(Listing::TopRatedMovies, 1),
        tmdb.listing(Listing::PopularMovies, 1),
        tmdb.listing(Listing::OnTheAirSeries, 1),
    )?;

    let mut seen = HashSet::new();
    let mut sources: Vec<MediaSummary> = Vec::new();
    for item in upcoming
        .into_iter()
        .chain(top_rated)
        .chain(popular)
        .chain(on_the_air)
    {
        if seen.insert((item.media_type, item.id)) {
            sources.push(item);
        }
        if sources.len() == TRAILER_SOURCE_LIMIT {
            break;
        }
    }

    let mut lookups = JoinSet::new();
    for (position, item) in sources.into_iter().enumerate() {
        let tmdb = Arc::clone(tmdb);
        lookups.spawn(async move { (position, trailer_card(&tmdb, item).await) });
    }

    let mut found: Vec<(usize, TrailerCard)> = Vec::new();
    while let Some(joined) = lookups.join_next().await {
        if let Ok((position, Some(card))) = joined {
            found.push((position, card));
        }
    }
    found.sort_by_key(|(position, _)| *position);

    let mut seen_keys = HashSet::new();
    let mut rail = Vec::new();
    for (_, card) in found {
        if seen_keys.insert(card.key.clone()) {
            rail.push(card);
            if rail.len() == TRAILER_RAIL_LIMIT {
                break;
            }
        }
    }
    Ok(rail)
}

async fn trailer_card(tmdb: &Arc<dyn TmdbApi>, item: MediaSummary) -> Option<TrailerCard> {
    let videos = match tmdb.videos(item.media_type, item.id).await {
        Ok(videos) => videos,
        Err(err) => {
            warn!(
                "skipping trailer for {} {}: {err:#}",
                item.media_type, item.id
            );
            return None;
        }
    };
    youtube_trailer(&videos).map(|video| TrailerCard {
        id: item.id,
        title: item.title,
        key: video.key.clone(),
        backdrop_path: item.backdrop_path,
        media_type: item.media_type,
        overview: item.overview,
        vote_average: item.vote_average,
        release_date: item.release_date,
    })
}

/// Combined movie and show search, each with its own locale fallback,
/// concatenated with movies first.
pub async fn search(tmdb: &Arc<dyn TmdbApi>, query: &str) -> Result<Vec<MediaSummary>> {
    let (movies, shows) = tokio::try_join!(
        tmdb.search(MediaType::Movie, query),
        tmdb.search(MediaType::Tv, query),
    )?;
    Ok(movies.into_iter().chain(shows).collect())
}

#[derive(Debug, Serialize)]
pub struct MoviePage {
    #[serde(flatten)]
    pub detail: MovieDetail,
    pub trailer_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TvPage {
    #[serde(flatten)]
    pub detail: TvDetail,
    pub trailer_key: Option<String>,
}

pub async fn movie_page(tmdb: &Arc<dyn TmdbApi>, id: i64) -> Result<MoviePage> {
    let detail = tmdb.movie_detail(id).await?;
    let trailer_key = detail_trailer_key(tmdb, MediaType::Movie, id).await;
    Ok(MoviePage {
        detail,
        trailer_key,
    })
}

pub async fn tv_page(tmdb: &Arc<dyn TmdbApi>, id: i64) -> Result<TvPage> {
    let detail = tmdb.tv_detail(id).await?;
    let trailer_key = detail_trailer_key(tmdb, MediaType::Tv, id).await;
    Ok(TvPage {
        detail,
        trailer_key,
    })
}

// Detail pages take the first YouTube trailer, else whatever video comes
// first. A failed video lookup leaves the page without a trailer instead of
// failing it.
async fn detail_trailer_key(
    tmdb: &Arc<dyn TmdbApi>,
    media: MediaType,
    id: i64,
) -> Option<String> {
    match tmdb.videos(media, id).await {
        Ok(videos) => youtube_trailer(&videos)
            .or_else(|| videos.first())
            .map(|video| video.key.clone()),
        Err(err) => {
            warn!("failed to fetch videos for {} {}: {err:#}", media, id);
            None
        }
    }
}
