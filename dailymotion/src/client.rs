//! The Dailymotion API client: videos, users, playlists, channels, and uploads.

use crate::codec;
use crate::fields::{Field, fields_param, filter_restricted};
use crate::metadata::Metadata;
use crate::oauth::TokenManager;
use crate::page::{Page, PagedStream};
use crate::params::{
    ChannelFilters, PlaylistCreateParams, PlaylistFilters, ToWireParams, UserFilters,
    VideoCreateParams, VideoCreateParamsBuilder, VideoFilters, VideoUpdateParams,
};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use eyre::Context;
use http::Method;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use tokio_stream::Stream;
use tracing::instrument;

/// Where to send a video file, as handed out by `GET /file/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadUrl {
    pub upload_url: String,
    pub progress_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    url: String,
}

/// Client for the Dailymotion REST API.
///
/// Calls are authenticated with whatever token the wrapped [`TokenManager`] currently holds;
/// public data can be read without one. Every call goes to the host selected by the manager's
/// key type.
///
/// Reads take a list of [`Field`]s. The same list is sent as the `fields` parameter and used to
/// parse the response, so an empty list means "the API's default fields". List calls drop
/// restricted fields first, since the API refuses them there.
#[derive(Debug)]
pub struct DailymotionClient<T> {
    auth: TokenManager<T>,
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

impl<T: Transport> DailymotionClient<T> {
    pub fn new(auth: TokenManager<T>) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &TokenManager<T> {
        &self.auth
    }

    /// Use this to run grants, refresh, or revoke.
    pub fn auth_mut(&mut self) -> &mut TokenManager<T> {
        &mut self.auth
    }

    pub fn into_auth(self) -> TokenManager<T> {
        self.auth
    }

    /// Sends one authenticated call and fails on any non-success status.
    async fn call(
        &self,
        method: Method,
        path: &str,
        params: IndexMap<String, String>,
    ) -> eyre::Result<ApiResponse> {
        let url = format!("{}{}", self.auth.base_url(), path);
        let request = ApiRequest::new(method.clone(), url)
            .params(params)
            .bearer(self.auth.bearer());
        self.auth
            .transport()
            .send(request)
            .await
            .with_context(|| format!("send {method} {path}"))?
            .error_for_status()
            .with_context(|| format!("{method} {path}"))
    }

    async fn fetch_object(
        &self,
        path: &str,
        mut params: IndexMap<String, String>,
        fields: &[Field],
    ) -> eyre::Result<Metadata> {
        if !fields.is_empty() {
            params.insert("fields".to_string(), fields_param(fields));
        }
        let response = self.call(Method::GET, path, params).await?;
        Ok(codec::from_json_str(&response.body, fields))
    }

    async fn fetch_page(
        &self,
        path: &str,
        mut params: IndexMap<String, String>,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        let fields = filter_restricted(fields);
        if !fields.is_empty() {
            params.insert("fields".to_string(), fields_param(&fields));
        }
        let response = self.call(Method::GET, path, params).await?;
        let page = Page::from_json_str(&response.body, &fields);
        tracing::debug!(
            path,
            page = page.page,
            returned_items = page.list.len(),
            has_more = page.has_more,
            "fetched page"
        );
        Ok(page)
    }

    /// Sends a write and reads back whatever object the API returns.
    async fn write_object(
        &self,
        method: Method,
        path: &str,
        params: IndexMap<String, String>,
    ) -> eyre::Result<Metadata> {
        let response = self.call(method, path, params).await?;
        Ok(codec::from_json_str(&response.body, &[]))
    }

    /// Fetches one video.
    ///
    /// Restricted fields are allowed here.
    ///
    /// See: <https://developers.dailymotion.com/api/#video>
    #[instrument(skip(self))]
    pub async fn get_video(&self, video_id: &str, fields: &[Field]) -> eyre::Result<Metadata> {
        self.fetch_object(
            &format!("/video/{}", segment(video_id)),
            IndexMap::new(),
            fields,
        )
        .await
    }

    /// Fetches one page of videos matching `filters`.
    #[instrument(skip(self))]
    pub async fn list_videos(
        &self,
        filters: &VideoFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page("/videos", filters.to_wire_params(), fields)
            .await
    }

    /// Walks every page of videos matching `filters`, starting at `filters.page` (or 1).
    pub fn stream_videos<'a>(
        &'a self,
        filters: &'a VideoFilters,
        fields: &'a [Field],
    ) -> impl Stream<Item = eyre::Result<Metadata>> + 'a {
        PagedStream::starting_at(filters.page.unwrap_or(1), move |page| {
            let filters = VideoFilters {
                page: Some(page),
                ..filters.clone()
            };
            async move {
                let page = self.list_videos(&filters, fields).await?;
                Ok((VecDeque::from(page.list), page.has_more))
            }
        })
    }

    /// Full-text video search.
    pub async fn search_videos(&self, query: &str, fields: &[Field]) -> eyre::Result<Page> {
        let filters = VideoFilters {
            search: Some(query.to_string()),
            ..Default::default()
        };
        self.list_videos(&filters, fields).await
    }

    /// Creates a video owned by the authenticated user from an uploaded file.
    ///
    /// Requires the `manage_videos` scope.
    #[instrument(skip(self, params), fields(title = params.title()))]
    pub async fn create_video(&self, params: &VideoCreateParams) -> eyre::Result<Metadata> {
        let video = self
            .write_object(Method::POST, "/me/videos", params.to_wire_params())
            .await?;
        tracing::debug!(video_id = ?video.id(), "created video");
        Ok(video)
    }

    #[instrument(skip(self, params))]
    pub async fn update_video(
        &self,
        video_id: &str,
        params: &VideoUpdateParams,
    ) -> eyre::Result<Metadata> {
        self.write_object(
            Method::POST,
            &format!("/video/{}", segment(video_id)),
            params.to_wire_params(),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_video(&self, video_id: &str) -> eyre::Result<()> {
        self.call(
            Method::DELETE,
            &format!("/video/{}", segment(video_id)),
            IndexMap::new(),
        )
        .await?;
        tracing::debug!(video_id, "deleted video");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str, fields: &[Field]) -> eyre::Result<Metadata> {
        self.fetch_object(
            &format!("/user/{}", segment(user_id)),
            IndexMap::new(),
            fields,
        )
        .await
    }

    /// The user the current token acts for.
    #[instrument(skip(self))]
    pub async fn get_me(&self, fields: &[Field]) -> eyre::Result<Metadata> {
        self.fetch_object("/me", IndexMap::new(), fields).await
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, filters: &UserFilters, fields: &[Field]) -> eyre::Result<Page> {
        self.fetch_page("/users", filters.to_wire_params(), fields)
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_user_videos(
        &self,
        user_id: &str,
        filters: &VideoFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page(
            &format!("/user/{}/videos", segment(user_id)),
            filters.to_wire_params(),
            fields,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_playlist(
        &self,
        playlist_id: &str,
        fields: &[Field],
    ) -> eyre::Result<Metadata> {
        self.fetch_object(
            &format!("/playlist/{}", segment(playlist_id)),
            IndexMap::new(),
            fields,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_playlists(
        &self,
        filters: &PlaylistFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page("/playlists", filters.to_wire_params(), fields)
            .await
    }

    /// Requires the `manage_playlists` scope.
    #[instrument(skip(self))]
    pub async fn create_playlist(&self, params: &PlaylistCreateParams) -> eyre::Result<Metadata> {
        self.write_object(Method::POST, "/me/playlists", params.to_wire_params())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_playlist(&self, playlist_id: &str) -> eyre::Result<()> {
        self.call(
            Method::DELETE,
            &format!("/playlist/{}", segment(playlist_id)),
            IndexMap::new(),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> eyre::Result<()> {
        self.call(
            Method::POST,
            &format!(
                "/playlist/{}/videos/{}",
                segment(playlist_id),
                segment(video_id)
            ),
            IndexMap::new(),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_video_from_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> eyre::Result<()> {
        self.call(
            Method::DELETE,
            &format!(
                "/playlist/{}/videos/{}",
                segment(playlist_id),
                segment(video_id)
            ),
            IndexMap::new(),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_playlist_videos(
        &self,
        playlist_id: &str,
        filters: &VideoFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page(
            &format!("/playlist/{}/videos", segment(playlist_id)),
            filters.to_wire_params(),
            fields,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_channel(&self, channel_id: &str, fields: &[Field]) -> eyre::Result<Metadata> {
        self.fetch_object(
            &format!("/channel/{}", segment(channel_id)),
            IndexMap::new(),
            fields,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_channels(
        &self,
        filters: &ChannelFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page("/channels", filters.to_wire_params(), fields)
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_channel_videos(
        &self,
        channel_id: &str,
        filters: &VideoFilters,
        fields: &[Field],
    ) -> eyre::Result<Page> {
        self.fetch_page(
            &format!("/channel/{}/videos", segment(channel_id)),
            filters.to_wire_params(),
            fields,
        )
        .await
    }

    /// Asks for a one-shot upload destination.
    #[instrument(skip(self))]
    pub async fn get_upload_url(&self) -> eyre::Result<UploadUrl> {
        let response = self
            .call(Method::GET, "/file/upload", IndexMap::new())
            .await?;
        serde_json::from_str(&response.body).context("parse upload URL response")
    }

    /// Uploads a local file and returns the URL to create a video from.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload_file(&self, path: &Path) -> eyre::Result<String> {
        let contents = tokio::fs::read(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        let destination = self.get_upload_url().await?;
        let response = self
            .auth
            .transport()
            .upload(&destination.upload_url, &file_name, contents)
            .await
            .context("upload video file")?
            .error_for_status()
            .context("upload video file")?;

        let uploaded: UploadedFile =
            serde_json::from_str(&response.body).context("parse upload response")?;
        tracing::debug!(url = %uploaded.url, "uploaded file");
        Ok(uploaded.url)
    }

    /// Uploads a local file and creates a video from it.
    ///
    /// `params` supplies everything but the URL, which comes from the upload.
    #[instrument(skip(self, path, params), fields(path = %path.display()))]
    pub async fn upload_video(
        &self,
        path: &Path,
        params: &VideoCreateParamsBuilder,
    ) -> eyre::Result<Metadata> {
        let url = self.upload_file(path).await?;
        let params = params
            .clone()
            .url(url)
            .build()
            .context("build video creation parameters")?;
        self.create_video(&params).await
    }
}
