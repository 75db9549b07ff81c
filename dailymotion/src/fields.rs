//! The field registry: symbolic field names and the wire names the API uses for them.
//!
//! Every [`Field`] maps to exactly one wire name, and every wire name maps back to exactly one
//! [`Field`]. The forward direction is a `match`; the reverse direction is a map built once on
//! first use. Neither table is ever mutated.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

macro_rules! field_registry {
    ($($(#[$meta:meta])* $variant:ident => $wire:literal,)*) => {
        /// A symbolic field of a Dailymotion object (video, user, playlist, or channel).
        ///
        /// Use [`Field::wire_name`] to get the key the API uses in request parameters and
        /// response bodies.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($(#[$meta])* $variant,)*
        }

        impl Field {
            /// Every registered field, in declaration order.
            pub const ALL: &'static [Field] = &[$(Field::$variant,)*];

            /// The literal key this field uses on the wire.
            pub const fn wire_name(self) -> &'static str {
                match self {
                    $(Field::$variant => $wire,)*
                }
            }
        }
    };
}

field_registry! {
    /// The object's unique identifier.
    Id => "id",
    Title => "title",
    Description => "description",
    /// Duration of a video, in seconds.
    Duration => "duration",
    /// Width over height, e.g. `1.7778`.
    AspectRatio => "aspect_ratio",
    Url => "url",
    EmbedUrl => "embed_url",
    ThumbnailUrl => "thumbnail_url",
    Thumbnail60Url => "thumbnail_60_url",
    Thumbnail120Url => "thumbnail_120_url",
    Thumbnail180Url => "thumbnail_180_url",
    Thumbnail240Url => "thumbnail_240_url",
    Thumbnail360Url => "thumbnail_360_url",
    Thumbnail480Url => "thumbnail_480_url",
    Thumbnail720Url => "thumbnail_720_url",
    Thumbnail1080Url => "thumbnail_1080_url",
    Poster180Url => "poster_180_url",
    Poster360Url => "poster_360_url",
    Filmstrip60Url => "filmstrip_60_url",
    /// Unix timestamp (seconds) of the object's creation.
    CreatedTime => "created_time",
    UpdatedTime => "updated_time",
    UploadedTime => "uploaded_time",
    Private => "private",
    /// Identifier usable to share a private object.
    PrivateId => "private_id",
    Published => "published",
    Status => "status",
    Tags => "tags",
    Channel => "channel",
    Owner => "owner",
    Language => "language",
    Country => "country",
    ViewsTotal => "views_total",
    LikesTotal => "likes_total",
    Explicit => "explicit",
    IsCreatedForKids => "is_created_for_kids",
    AllowEmbed => "allow_embed",
    /// Either `vod` or `live`.
    Mode => "mode",
    Onair => "onair",
    Password => "password",
    PasswordProtected => "password_protected",
    Geoblocking => "geoblocking",
    AccessError => "access_error",
    StreamH264Url => "stream_h264_url",
    StreamH264HdUrl => "stream_h264_hd_url",
    StreamHlsUrl => "stream_hls_url",
    Username => "username",
    ScreenName => "screenname",
    Email => "email",
    FirstName => "first_name",
    LastName => "last_name",
    Gender => "gender",
    Birthday => "birthday",
    Avatar60Url => "avatar_60_url",
    Avatar120Url => "avatar_120_url",
    Avatar240Url => "avatar_240_url",
    Avatar720Url => "avatar_720_url",
    Cover250Url => "cover_250_url",
    CoverUrl => "cover_url",
    FollowersTotal => "followers_total",
    FollowingTotal => "following_total",
    VideosTotal => "videos_total",
    PlaylistsTotal => "playlists_total",
    Verified => "verified",
    Partner => "partner",
    Name => "name",
    /// Number of videos in a playlist.
    VideosCount => "videos_count",
    ItemType => "item_type",
    Slug => "slug",
}

static BY_WIRE_NAME: LazyLock<HashMap<&'static str, Field>> = LazyLock::new(|| {
    Field::ALL
        .iter()
        .map(|&field| (field.wire_name(), field))
        .collect()
});

impl Field {
    /// Looks up the symbolic field for a wire name.
    ///
    /// Returns `None` for keys that are not in the registry.
    pub fn from_wire(wire_name: &str) -> Option<Field> {
        BY_WIRE_NAME.get(wire_name).copied()
    }

    /// Whether the API refuses to return this field in list responses.
    ///
    /// Restricted fields can only be fetched one object at a time.
    pub const fn is_restricted(self) -> bool {
        matches!(
            self,
            Field::StreamH264Url
                | Field::StreamH264HdUrl
                | Field::StreamHlsUrl
                | Field::Filmstrip60Url
                | Field::Geoblocking
                | Field::AccessError
                | Field::Email
                | Field::Birthday
                | Field::Password
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

/// Drops every restricted field, keeping the order of the rest.
pub fn filter_restricted(fields: &[Field]) -> Vec<Field> {
    fields
        .iter()
        .copied()
        .filter(|field| !field.is_restricted())
        .collect()
}

/// Renders fields as the value of the `fields` query parameter.
pub fn fields_param(fields: &[Field]) -> String {
    let wire_names: Vec<_> = fields.iter().map(|field| field.wire_name()).collect();
    wire_names.join(",")
}
