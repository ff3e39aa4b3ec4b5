mod link;

pub use link::{
    ClickEvent, LinkRecord, LinkStats, LinkStatus, NewLink, ShortenRequest, ShortenResponse,
    DIRECT_SOURCE, UNKNOWN_LOCATION,
};
