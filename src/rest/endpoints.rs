//! AppNexus REST API endpoint constants.

/// Base URL for the AppNexus REST API.
pub const APPNEXUS_BASE_URL: &str = "https://api.appnexus.com";

/// Authentication endpoint (POST for credentials, GET for signed app requests).
pub const AUTH: &str = "/auth";

/// Paging query parameters and response fields.
pub mod paging {
    /// Offset of the first element.
    pub const START_ELEMENT: &str = "start_element";
    /// Number of elements requested or returned.
    pub const NUM_ELEMENTS: &str = "num_elements";
    /// Total number of elements in the collection.
    pub const COUNT: &str = "count";
}

/// Envelope fields.
pub mod fields {
    /// Session token in auth responses.
    pub const TOKEN: &str = "token";
    /// Server-assigned object id in create/update responses.
    pub const ID: &str = "id";
    /// Quota telemetry.
    pub const DBG_INFO: &str = "dbg_info";
}
