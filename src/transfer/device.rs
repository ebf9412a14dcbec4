//! Same-device detection.
//!
//! Both sides are canonicalized (dunce keeps Windows paths free of `\\?\`).
//! A destination that does not exist yet is judged by its nearest existing
//! ancestor. Any failure answers "different device", which only ever costs a
//! copy where a rename would have done.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform;

/// Answers whether a rename from `source` into `destination_root` can stay on one device.
pub trait DeviceDetector: Send + Sync {
    fn same_device(&self, source: &Path, destination_root: &Path) -> bool;
}

/// Asks the OS (device id on Unix, volume serial on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsDeviceDetector;

impl DeviceDetector for OsDeviceDetector {
    fn same_device(&self, source: &Path, destination_root: &Path) -> bool {
        same_device(source, destination_root)
    }
}

/// Fixed answer, for callers that already know the topology.
#[derive(Debug, Clone, Copy)]
pub struct StaticTopology {
    pub same_device: bool,
}

impl DeviceDetector for StaticTopology {
    fn same_device(&self, _source: &Path, _destination_root: &Path) -> bool {
        self.same_device
    }
}

pub fn same_device(source: &Path, destination_root: &Path) -> bool {
    let Some(src) = resolve(source, false) else {
        debug!(path = %source.display(), "source unresolvable; treating as cross-device");
        return false;
    };
    let Some(dst) = resolve(destination_root, true) else {
        debug!(
            path = %destination_root.display(),
            "destination unresolvable; treating as cross-device"
        );
        return false;
    };
    match (platform::device_id(&src), platform::device_id(&dst)) {
        (Ok(a), Ok(b)) => a == b,
        (a, b) => {
            debug!(src_err = ?a.err(), dst_err = ?b.err(), "device id lookup failed");
            false
        }
    }
}

fn resolve(path: &Path, allow_missing: bool) -> Option<PathBuf> {
    if let Ok(p) = dunce::canonicalize(path) {
        return Some(p);
    }
    if !allow_missing {
        return None;
    }
    let absolute = std::path::absolute(path).ok()?;
    absolute
        .ancestors()
        .skip(1)
        .find_map(|a| dunce::canonicalize(a).ok())
}
