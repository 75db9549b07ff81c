//! Typed request parameters and their flattening into wire-format key/value pairs.
//!
//! Encoding rules:
//!
//! - booleans are `true`/`false`
//! - lists are joined with `,`
//! - timestamps are Unix seconds
//! - the `context` map is joined into one `key=value&key=value` string which is then
//!   percent-encoded as a whole; its parts are not encoded on their own
//!
//! Fields that are unset or encode to an empty string are left out entirely. Other values are
//! not escaped here; that is the HTTP layer's job.

use derive_builder::Builder;
use indexmap::IndexMap;
use jiff::Timestamp;

/// Renders a parameter value the way the API expects it.
pub trait WireEncode {
    fn encode(&self) -> String;
}

impl<T: WireEncode + ?Sized> WireEncode for &T {
    fn encode(&self) -> String {
        T::encode(*self)
    }
}

impl WireEncode for str {
    fn encode(&self) -> String {
        self.to_string()
    }
}

impl WireEncode for String {
    fn encode(&self) -> String {
        self.clone()
    }
}

impl WireEncode for bool {
    fn encode(&self) -> String {
        match self {
            true => String::from("true"),
            false => String::from("false"),
        }
    }
}

impl WireEncode for u32 {
    fn encode(&self) -> String {
        self.to_string()
    }
}

impl WireEncode for i64 {
    fn encode(&self) -> String {
        self.to_string()
    }
}

impl WireEncode for [String] {
    fn encode(&self) -> String {
        self.join(",")
    }
}

impl WireEncode for Vec<String> {
    fn encode(&self) -> String {
        self.as_slice().encode()
    }
}

impl WireEncode for Timestamp {
    fn encode(&self) -> String {
        self.as_second().to_string()
    }
}

/// Flattens an options object into request parameters.
pub trait ToWireParams {
    fn to_wire_params(&self) -> IndexMap<String, String>;
}

#[derive(Debug, Default)]
struct WireParams(IndexMap<String, String>);

impl WireParams {
    fn put<V: WireEncode + ?Sized>(&mut self, key: &str, value: Option<&V>) -> &mut Self {
        if let Some(value) = value {
            let encoded = value.encode();
            if !encoded.is_empty() {
                self.0.insert(key.to_string(), encoded);
            }
        }
        self
    }

    fn finish(&mut self) -> IndexMap<String, String> {
        std::mem::take(&mut self.0)
    }
}

/// Builds the `context` parameter: the pairs are joined unescaped, then the whole string is
/// percent-encoded once.
pub fn encode_context(context: &IndexMap<String, String>) -> Option<String> {
    if context.is_empty() {
        return None;
    }
    let joined = context
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    Some(urlencoding::encode(&joined).into_owned())
}

/// Result ordering for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Recent,
    Relevance,
    Visited,
    Trending,
    Random,
    Alpha,
    Most,
    Least,
    Old,
}

impl WireEncode for Sort {
    fn encode(&self) -> String {
        let s = match self {
            Sort::Recent => "recent",
            Sort::Relevance => "relevance",
            Sort::Visited => "visited",
            Sort::Trending => "trending",
            Sort::Random => "random",
            Sort::Alpha => "alpha",
            Sort::Most => "most",
            Sort::Least => "least",
            Sort::Old => "old",
        };
        s.to_string()
    }
}

/// Parameters for creating a video from an already uploaded file.
///
/// `url` and `title` are required; building without them fails.
///
/// See: <https://developers.dailymotion.com/api/#video-fields>
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct VideoCreateParams {
    /// Where the API can fetch the video file, usually the URL returned by an upload.
    #[builder(setter(into))]
    url: String,

    #[builder(setter(into))]
    title: String,

    /// The channel (category) slug, e.g. `news`.
    #[builder(setter(into, strip_option), default)]
    channel: Option<String>,

    #[builder(setter(into, strip_option), default)]
    description: Option<String>,

    #[builder(setter(into, strip_option), default)]
    tags: Option<Vec<String>>,

    #[builder(setter(strip_option), default)]
    private: Option<bool>,

    /// Videos are drafts until published.
    #[builder(setter(strip_option), default)]
    published: Option<bool>,

    #[builder(setter(strip_option), default)]
    is_created_for_kids: Option<bool>,

    #[builder(setter(into, strip_option), default)]
    language: Option<String>,

    #[builder(setter(into, strip_option), default)]
    country: Option<String>,

    #[builder(setter(into, strip_option), default)]
    password: Option<String>,

    #[builder(setter(strip_option), default)]
    allow_embed: Option<bool>,

    #[builder(setter(strip_option), default)]
    explicit: Option<bool>,
}

impl VideoCreateParams {
    pub fn builder() -> VideoCreateParamsBuilder {
        VideoCreateParamsBuilder::default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl VideoCreateParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.url.as_ref().is_some_and(|url| url.trim().is_empty()) {
            return Err("video url must not be empty".to_string());
        }
        if self.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err("video title must not be empty".to_string());
        }
        Ok(())
    }
}

impl ToWireParams for VideoCreateParams {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("url", Some(&self.url))
            .put("title", Some(&self.title))
            .put("channel", self.channel.as_ref())
            .put("description", self.description.as_ref())
            .put("tags", self.tags.as_ref())
            .put("private", self.private.as_ref())
            .put("published", self.published.as_ref())
            .put("is_created_for_kids", self.is_created_for_kids.as_ref())
            .put("language", self.language.as_ref())
            .put("country", self.country.as_ref())
            .put("password", self.password.as_ref())
            .put("allow_embed", self.allow_embed.as_ref())
            .put("explicit", self.explicit.as_ref())
            .finish()
    }
}

/// Changes to an existing video. Unset fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct VideoUpdateParams {
    pub title: Option<String>,
    pub channel: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub private: Option<bool>,
    pub published: Option<bool>,
    pub is_created_for_kids: Option<bool>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub password: Option<String>,
    pub allow_embed: Option<bool>,
    pub explicit: Option<bool>,
}

impl ToWireParams for VideoUpdateParams {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("title", self.title.as_ref())
            .put("channel", self.channel.as_ref())
            .put("description", self.description.as_ref())
            .put("tags", self.tags.as_ref())
            .put("private", self.private.as_ref())
            .put("published", self.published.as_ref())
            .put("is_created_for_kids", self.is_created_for_kids.as_ref())
            .put("language", self.language.as_ref())
            .put("country", self.country.as_ref())
            .put("password", self.password.as_ref())
            .put("allow_embed", self.allow_embed.as_ref())
            .put("explicit", self.explicit.as_ref())
            .finish()
    }
}

/// Filters for video lists and searches.
///
/// See: <https://developers.dailymotion.com/api/#video-filters>
#[derive(Debug, Clone, Default)]
pub struct VideoFilters {
    /// Full-text search query.
    pub search: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Tags that must all match exactly.
    pub strongtags: Option<Vec<String>>,
    pub channel: Option<String>,
    pub owners: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub private: Option<bool>,
    pub flags: Option<Vec<String>>,
    pub sort: Option<Sort>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub created_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,
    /// Minimum duration, in minutes.
    pub longer_than: Option<u32>,
    /// Maximum duration, in minutes.
    pub shorter_than: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Free-form key/value context, sent as a single escaped parameter.
    pub context: IndexMap<String, String>,
}

impl ToWireParams for VideoFilters {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("search", self.search.as_ref())
            .put("tags", self.tags.as_ref())
            .put("strongtags", self.strongtags.as_ref())
            .put("channel", self.channel.as_ref())
            .put("owners", self.owners.as_ref())
            .put("ids", self.ids.as_ref())
            .put("private", self.private.as_ref())
            .put("flags", self.flags.as_ref())
            .put("sort", self.sort.as_ref())
            .put("language", self.language.as_ref())
            .put("country", self.country.as_ref())
            .put("created_after", self.created_after.as_ref())
            .put("created_before", self.created_before.as_ref())
            .put("longer_than", self.longer_than.as_ref())
            .put("shorter_than", self.shorter_than.as_ref())
            .put("page", self.page.as_ref())
            .put("limit", self.limit.as_ref())
            .put("context", encode_context(&self.context).as_ref())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub search: Option<String>,
    pub ids: Option<Vec<String>>,
    pub usernames: Option<Vec<String>>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ToWireParams for UserFilters {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("search", self.search.as_ref())
            .put("ids", self.ids.as_ref())
            .put("usernames", self.usernames.as_ref())
            .put("sort", self.sort.as_ref())
            .put("page", self.page.as_ref())
            .put("limit", self.limit.as_ref())
            .finish()
    }
}

/// Parameters for creating a playlist. `name` is required.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct PlaylistCreateParams {
    #[builder(setter(into))]
    name: String,

    #[builder(setter(into, strip_option), default)]
    description: Option<String>,

    #[builder(setter(strip_option), default)]
    private: Option<bool>,
}

impl PlaylistCreateParams {
    pub fn builder() -> PlaylistCreateParamsBuilder {
        PlaylistCreateParamsBuilder::default()
    }
}

impl PlaylistCreateParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err("playlist name must not be empty".to_string());
        }
        Ok(())
    }
}

impl ToWireParams for PlaylistCreateParams {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("name", Some(&self.name))
            .put("description", self.description.as_ref())
            .put("private", self.private.as_ref())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistFilters {
    pub search: Option<String>,
    pub owner: Option<String>,
    pub ids: Option<Vec<String>>,
    pub private: Option<bool>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ToWireParams for PlaylistFilters {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("search", self.search.as_ref())
            .put("owner", self.owner.as_ref())
            .put("ids", self.ids.as_ref())
            .put("private", self.private.as_ref())
            .put("sort", self.sort.as_ref())
            .put("page", self.page.as_ref())
            .put("limit", self.limit.as_ref())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelFilters {
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ToWireParams for ChannelFilters {
    fn to_wire_params(&self) -> IndexMap<String, String> {
        WireParams::default()
            .put("sort", self.sort.as_ref())
            .put("page", self.page.as_ref())
            .put("limit", self.limit.as_ref())
            .finish()
    }
}
