//! Network layer.
//!
//! - `transport`: the [`Transport`] seam and its reqwest implementation
//! - `gateway`: request building and response classification
//! - `endpoints`: one typed method per backend endpoint

pub mod endpoints;
pub mod gateway;
pub mod transport;

pub use endpoints::{
    ClubsFilter, DocumentsFilter, GamesFilter, MihfApi, PlayersFilter, StandingsFilter,
    TeamsFilter, TournamentsFilter,
};
pub use gateway::{classify, ApiGateway, ApiRequest, Classified};
pub use transport::{Method, RawRequest, RawResponse, ReqwestTransport, Transport, TransportError};
