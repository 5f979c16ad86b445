//! Guide endpoint handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use opentv_guide::{
    Channel, ChannelGuideEntry, EPG_CONTENT_TYPE, PLAYLIST_CONTENT_TYPE, Program, encode_playlist,
    join_url,
};
use serde::Serialize;

use super::AppState;
use super::error::AppError;

/// Path of the EPG document, linked from the playlist header.
pub const EPG_PATH: &str = "epg.xml";

/// Body of `GET /api/guide`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideResponse {
    /// Evaluation instant of the guide.
    pub generated_at: DateTime<Utc>,
    /// `true` if any data came from the fallback source.
    pub using_fallback: bool,
    /// One entry per channel.
    pub channels: Vec<ChannelGuideEntry>,
}

/// Derives the public base URL of a request.
///
/// Honors `X-Forwarded-Proto` and `X-Forwarded-Host` from a reverse proxy,
/// then the `Host` header. Falls back to `default_url` when no host is
/// known.
pub fn request_base_url(headers: &HeaderMap, default_url: &str) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let Some(host) = header_value("x-forwarded-host").or_else(|| header_value(header::HOST.as_str()))
    else {
        return String::from(default_url.trim_end_matches('/'));
    };
    let scheme = header_value("x-forwarded-proto").unwrap_or("http");

    format!("{scheme}://{host}")
}

/// `GET /api/channels`
pub async fn channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, AppError> {
    let guide = state.refresher.refresh(Utc::now()).await?;
    Ok(Json(guide.channels.clone()))
}

/// `GET /api/programs`
pub async fn programs(State(state): State<AppState>) -> Result<Json<Vec<Program>>, AppError> {
    let guide = state.refresher.refresh(Utc::now()).await?;
    Ok(Json(guide.programs.clone()))
}

/// `GET /api/guide`
pub async fn guide(State(state): State<AppState>) -> Result<Json<GuideResponse>, AppError> {
    let now = Utc::now();
    let loaded = state.refresher.refresh(now).await?;
    Ok(Json(GuideResponse {
        generated_at: now,
        using_fallback: loaded.using_fallback,
        channels: loaded.guide(now),
    }))
}

/// `GET /playlist.m3u`
pub async fn playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let loaded = state.refresher.refresh(Utc::now()).await?;
    let base_url = request_base_url(&headers, &state.public_url);
    let body = encode_playlist(&loaded.channels, &base_url, &join_url(&base_url, EPG_PATH));
    Ok(([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], body))
}

/// `GET /epg.xml`
pub async fn epg(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let loaded = state.refresher.refresh(Utc::now()).await?;
    let base_url = request_base_url(&headers, &state.public_url);
    let body = state
        .epg_encoder
        .encode(&loaded.channels, &loaded.programs_by_channel(), &base_url);
    Ok(([(header::CONTENT_TYPE, EPG_CONTENT_TYPE)], body))
}
