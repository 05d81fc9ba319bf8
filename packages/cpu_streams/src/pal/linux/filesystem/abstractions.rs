use std::fmt::Debug;

/// Linux has this funny notion of exposing various OS APIs as a virtual filesystem. This trait
/// abstracts the parts of that virtual filesystem that topology detection reads, to allow it
/// to be mocked.
///
/// The scope of this trait is limited to only the virtual filesystem exposed by the OS. We do
/// not expect to do "real" file I/O in this layer. All I/O is synchronous and blocking because
/// we expect it to hit a fast path in the OS, given the data is never on a real storage device.
///
/// Every read returns `None` when the file does not exist, which topology detection treats as
/// a degraded (but never fatal) answer.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Filesystem: Debug + Send + Sync + 'static {
    /// Contents of the /sys/devices/system/cpu/present file.
    ///
    /// This is a cpulist format file ("0,1,2-4,5-10:2" style list) naming every logical
    /// processor the kernel knows about, including offline ones.
    fn get_cpus_present_contents(&self) -> Option<String>;

    /// Contents of /sys/devices/system/cpu/cpu{}/topology/physical_package_id.
    ///
    /// This is a single-line file with the socket number of the processor.
    fn get_package_id_contents(&self, cpu_index: u32) -> Option<String>;

    /// Contents of /sys/devices/system/cpu/cpu{}/topology/thread_siblings_list.
    ///
    /// This is a cpulist format file naming every logical processor of the same physical
    /// core, the queried processor included. Two entries mean hyperthreading.
    fn get_thread_siblings_contents(&self, cpu_index: u32) -> Option<String>;

    /// Contents of /sys/devices/system/cpu/cpu{}/cache/index2/shared_cpu_list.
    ///
    /// This is a cpulist format file naming every logical processor sharing the level-2
    /// cache with the queried processor, itself included.
    fn get_l2_shared_cpus_contents(&self, cpu_index: u32) -> Option<String>;
}
