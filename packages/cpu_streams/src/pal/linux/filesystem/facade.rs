use std::fmt::Debug;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::linux::MockFilesystem;
use crate::pal::linux::{BuildTargetFilesystem, Filesystem};

/// Hides the real/mock filesystem choice behind a single type.
#[derive(Debug)]
pub(crate) enum FilesystemFacade {
    Real(BuildTargetFilesystem),

    #[cfg(test)]
    Mock(Arc<MockFilesystem>),
}

impl FilesystemFacade {
    pub(crate) const fn real() -> Self {
        Self::Real(BuildTargetFilesystem)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockFilesystem) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Filesystem for FilesystemFacade {
    fn get_cpus_present_contents(&self) -> Option<String> {
        match self {
            Self::Real(fs) => fs.get_cpus_present_contents(),
            #[cfg(test)]
            Self::Mock(fs) => fs.get_cpus_present_contents(),
        }
    }

    fn get_package_id_contents(&self, cpu_index: u32) -> Option<String> {
        match self {
            Self::Real(fs) => fs.get_package_id_contents(cpu_index),
            #[cfg(test)]
            Self::Mock(fs) => fs.get_package_id_contents(cpu_index),
        }
    }

    fn get_thread_siblings_contents(&self, cpu_index: u32) -> Option<String> {
        match self {
            Self::Real(fs) => fs.get_thread_siblings_contents(cpu_index),
            #[cfg(test)]
            Self::Mock(fs) => fs.get_thread_siblings_contents(cpu_index),
        }
    }

    fn get_l2_shared_cpus_contents(&self, cpu_index: u32) -> Option<String> {
        match self {
            Self::Real(fs) => fs.get_l2_shared_cpus_contents(cpu_index),
            #[cfg(test)]
            Self::Mock(fs) => fs.get_l2_shared_cpus_contents(cpu_index),
        }
    }
}
