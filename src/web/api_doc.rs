use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::scan::{
    CommandAccepted, HorizontalRequest, RefineRequest, SectionRequest, StatusResponse,
    ThresholdRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::scan::full,
        super::api::scan::horizontal,
        super::api::scan::section,
        super::api::scan::single,
        super::api::scan::stop,
        super::api::scan::forward,
        super::api::scan::refine,
        super::api::scan::clear,
        super::api::scan::threshold,
        super::api::scan::calibrate,
        super::api::scan::status,
        super::api::scan::report,
        super::api::scan::tracks,
        super::api::scan::channels,
    ),
    components(
        schemas(
            CommandAccepted,
            StatusResponse,
            HorizontalRequest,
            SectionRequest,
            RefineRequest,
            ThresholdRequest,
            ErrorResponse,
            crate::scan::ScanCommand,
            crate::scan::ScanMode,
            crate::scan::ScanReport,
            crate::scan::LabelledDetection,
            crate::tracker::Track,
            crate::tracker::PositionSample,
            crate::channel::ChannelLabel,
            crate::channel::ChannelBoard,
            crate::channel::ChannelEntry,
            crate::spectrum::Detection,
            crate::spectrum::SpectrumSample,
            crate::motion::Waypoint,
            crate::motion::Bearing,
            crate::motion::Telemetry,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Scan-O-Mat API",
        description = "Control and observe the antenna scanning engine",
        version = "0.1.0"
    ),
    tags(
        (name = "scan", description = "Scan patterns, tracks and channels")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_scan_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for route in [
            "/api/scan/full",
            "/api/scan/horizontal",
            "/api/scan/section",
            "/api/scan/refine",
            "/api/scan/threshold",
            "/api/scan/status",
            "/api/scan/channels",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == route), "missing {}", route);
        }
        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("api_key"));
    }
}
