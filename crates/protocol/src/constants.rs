/// Health-check path probed right after association.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Listing path; the job is selected with the [`JOB_ID_PARAM`] query parameter.
pub const DEFAULT_LIST_PATH: &str = "/files";

/// Download path; the file is selected with the [`NAME_PARAM`] query parameter.
pub const DEFAULT_DOWNLOAD_PATH: &str = "/download";

/// Query parameter carrying the job identifier on listing requests.
pub const JOB_ID_PARAM: &str = "jobId";

/// Query parameter carrying the file name on download requests.
pub const NAME_PARAM: &str = "name";

/// Joins a server base URL and an endpoint path without doubling slashes.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_cleanly() {
        assert_eq!(
            endpoint_url("http://192.168.4.1", "/health"),
            "http://192.168.4.1/health"
        );
        assert_eq!(
            endpoint_url("http://192.168.4.1/", "/health"),
            "http://192.168.4.1/health"
        );
        assert_eq!(
            endpoint_url("http://192.168.4.1:8080/", "files"),
            "http://192.168.4.1:8080/files"
        );
    }
}
