//! Plugin protocol dispatch.

use localvol_shared::protocol::{
    ActivateResponse, DriverRequest, DriverResponse, ErrorResponse, GetResponse, ListResponse,
    MountResponse,
};

use super::VolumeDriver;

impl VolumeDriver {
    /// Run one protocol request. Failures are reported in the response's
    /// `Err` field, never as a panic or early exit.
    pub fn handle(&self, request: DriverRequest) -> DriverResponse {
        match request {
            DriverRequest::Activate => DriverResponse::Activate(ActivateResponse {
                implements: self.activate(),
            }),
            DriverRequest::Create(req) => {
                DriverResponse::Error(ErrorResponse::from_result(self.create(&req.name, &req.opts)))
            }
            DriverRequest::Mount(req) => DriverResponse::Mount(MountResponse::from_result(
                self.mount(&req.name).map(|p| p.display().to_string()),
            )),
            DriverRequest::Path(req) => DriverResponse::Mount(MountResponse::from_result(
                self.path(&req.name).map(|p| p.display().to_string()),
            )),
            DriverRequest::Unmount(req) => {
                DriverResponse::Error(ErrorResponse::from_result(self.unmount(&req.name)))
            }
            DriverRequest::Remove(req) => {
                DriverResponse::Error(ErrorResponse::from_result(self.remove(&req.name)))
            }
            DriverRequest::Get(req) => {
                DriverResponse::Get(GetResponse::from_result(self.get(&req.name)))
            }
            DriverRequest::List => DriverResponse::List(ListResponse {
                volumes: self.list(),
                err: String::new(),
            }),
        }
    }

    /// Parse one JSON request line and serialize the response.
    ///
    /// A line that does not parse yields an error response.
    pub fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<DriverRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting malformed request");
                DriverResponse::Error(ErrorResponse::from_message(format!(
                    "Invalid request: {}",
                    e
                )))
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            serde_json::json!({ "Err": format!("failed to serialize response: {}", e) }).to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use localvol_shared::protocol::{CreateRequest, NameRequest, VolumeInfo};
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{MemoryFileSystem, RecordingInvoker};

    fn driver() -> VolumeDriver {
        let fs = Arc::new(MemoryFileSystem::new());
        let invoker = Arc::new(RecordingInvoker::new(fs.clone()));
        VolumeDriver::new(fs, invoker, Path::new("/r")).unwrap()
    }

    fn call(driver: &VolumeDriver, line: &str) -> Value {
        serde_json::from_str(&driver.handle_line(line)).unwrap()
    }

    #[test]
    fn test_activate() {
        let driver = driver();
        assert_eq!(
            call(&driver, r#"{"Method":"Activate"}"#),
            json!({"Implements": ["VolumeDriver"]})
        );
    }

    #[test]
    fn test_full_lifecycle_over_lines() {
        let driver = driver();

        assert_eq!(
            call(
                &driver,
                r#"{"Method":"Create","Name":"app","Opts":{"volume_id":"id-1"}}"#
            ),
            json!({"Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Mount","Name":"app"}"#),
            json!({"Mountpoint": "/r/_mounts/id-1", "Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Path","Name":"app"}"#),
            json!({"Mountpoint": "/r/_mounts/id-1", "Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Get","Name":"app"}"#),
            json!({"Volume": {"Name": "app", "Mountpoint": "/r/_mounts/id-1"}, "Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Unmount","Name":"app"}"#),
            json!({"Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Path","Name":"app"}"#),
            json!({"Mountpoint": "", "Err": "Volume 'app' not previously mounted"})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"Remove","Name":"app"}"#),
            json!({"Err": ""})
        );
        assert_eq!(
            call(&driver, r#"{"Method":"List"}"#),
            json!({"Volumes": [], "Err": ""})
        );
    }

    #[test]
    fn test_errors_are_response_data() {
        let driver = driver();

        let resp = driver.handle(DriverRequest::Mount(NameRequest::new("missing")));
        assert_eq!(resp.err(), Some("Volume 'missing' not found"));

        let resp = driver.handle(DriverRequest::Create(CreateRequest {
            name: "app".into(),
            opts: Default::default(),
        }));
        assert_eq!(
            resp.err(),
            Some("Missing mandatory 'volume_id' field in 'Opts'")
        );

        let resp = driver.handle(DriverRequest::Get(NameRequest::new("missing")));
        assert_eq!(
            resp,
            DriverResponse::Get(GetResponse {
                volume: VolumeInfo::default(),
                err: "Volume 'missing' not found".into(),
            })
        );
    }

    #[test]
    fn test_malformed_line() {
        let driver = driver();
        let resp = call(&driver, "not json");
        assert!(resp["Err"].as_str().unwrap().starts_with("Invalid request"));

        let resp = call(&driver, r#"{"Method":"Explode"}"#);
        assert!(resp["Err"].as_str().unwrap().starts_with("Invalid request"));
    }
}
