// SPDX-License-Identifier: GPL-3.0-or-later

//! Last.fm web-service client used as the reference catalog: artist search,
//! an artist's top albums, and per-album track listings.

pub mod lastfm;

pub use lastfm::{
    AlbumInfo, ArtistMatch, Catalog, CatalogAlbum, LastFmClient, LastFmError, TopAlbum,
};
