use std::fmt::Debug;
use std::fs;

use crate::pal::linux::Filesystem;

/// The virtual filesystem for the real operating system that the build is targeting.
///
/// You would only use different filesystems in PAL unit tests that need to use a mock
/// filesystem. Even then, whenever possible, unit tests should use the real filesystem for
/// maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetFilesystem;

impl Filesystem for BuildTargetFilesystem {
    fn get_cpus_present_contents(&self) -> Option<String> {
        fs::read_to_string("/sys/devices/system/cpu/present").ok()
    }

    fn get_package_id_contents(&self, cpu_index: u32) -> Option<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{cpu_index}/topology/physical_package_id"
        ))
        .ok()
    }

    fn get_thread_siblings_contents(&self, cpu_index: u32) -> Option<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{cpu_index}/topology/thread_siblings_list"
        ))
        .ok()
    }

    fn get_l2_shared_cpus_contents(&self, cpu_index: u32) -> Option<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{cpu_index}/cache/index2/shared_cpu_list"
        ))
        .ok()
    }
}
