use std::fmt::Debug;

use windows::Win32::System::SystemInformation::{
    LOGICAL_PROCESSOR_RELATIONSHIP, SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX,
};
use windows::core::Result;

/// Bindings for the operating system APIs we rely on to inspect processor layout.
///
/// All the methods are directly wrapping OS functions with no logic on top. This keeps
/// the unsafe surface thin and lets the interesting logic remain testable via mocks.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    /// Returns the maximum number of logical processors in the given processor group,
    /// where `ALL_PROCESSOR_GROUPS` means the whole machine.
    fn get_maximum_processor_count(&self, group_number: u16) -> u32;

    /// Queries logical processor relationship records into a caller-provided buffer.
    ///
    /// The first call is typically made with no buffer to discover the required size,
    /// after which `returned_length` holds the number of bytes needed.
    ///
    /// # Safety
    ///
    /// `buffer`, if provided, must point to at least `*returned_length` writable bytes.
    /// `returned_length` must point to a valid `u32`.
    unsafe fn get_logical_processor_information_ex(
        &self,
        relationship_type: LOGICAL_PROCESSOR_RELATIONSHIP,
        buffer: Option<*mut SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>,
        returned_length: *mut u32,
    ) -> Result<()>;
}
