// Backing stores for rings ("memory zones").
// A zone is a zero-filled, 128-byte aligned region; the ring writes its header
// at the start and keeps element storage directly after it.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;

/// Alignment every zone guarantees for its base pointer.
pub const ZONE_ALIGN: usize = 128;

/// A fixed-size region of memory a ring can be laid out in.
pub trait MemoryZone: Send + Sync + Debug {
    /// Get a pointer to the start of the region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the region in bytes
    fn size(&self) -> usize;

    /// Get the OS handle behind the region, if any
    fn raw_handle(&self) -> RawHandle;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawHandle {
    /// Plain heap memory, no OS handle.
    None,
    /// Unix file descriptor (Linux)
    Fd(i32),
}

/// Zero-filled heap allocation aligned to [`ZONE_ALIGN`].
#[derive(Debug)]
pub struct HeapZone {
    ptr: NonNull<u8>,
    layout: Layout,
}

// The zone is only raw bytes; synchronization is the ring's job.
unsafe impl Send for HeapZone {}
unsafe impl Sync for HeapZone {}

impl HeapZone {
    pub fn new(size: usize) -> io::Result<Self> {
        let layout = Layout::from_size_align(size.max(1), ZONE_ALIGN).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("bad zone layout: {e}"))
        })?;
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!("failed to allocate {} byte zone", layout.size()),
            )
        })?;
        Ok(Self { ptr, layout })
    }
}

impl Drop for HeapZone {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl MemoryZone for HeapZone {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.layout.size()
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::None
    }
}

/// Create a heap-backed zone of `size` bytes.
pub fn create_heap_zone(size: usize) -> io::Result<Box<dyn MemoryZone>> {
    Ok(Box::new(HeapZone::new(size)?))
}

/// Create a new shared memory region with the specified size
///
/// # Arguments
/// * `size` - Size of the shared memory region in bytes
/// * `name` - Name of the file created under `/dev/shm`
///
/// # Returns
/// A boxed trait object implementing MemoryZone. The file is unlinked when
/// the zone is dropped.
#[cfg(target_os = "linux")]
pub fn create_shared_memory(size: usize, name: &str) -> io::Result<Box<dyn MemoryZone>> {
    Ok(Box::new(LinuxSharedMemory::create(size, name)?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(_size: usize, _name: &str) -> io::Result<Box<dyn MemoryZone>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
pub use linux::LinuxSharedMemory;

#[cfg(target_os = "linux")]
mod linux {
    use super::{MemoryZone, RawHandle};
    use std::fs::{self, OpenOptions};
    use std::io;
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::os::unix::fs::OpenOptionsExt;
    use std::path::PathBuf;
    use std::ptr::{self, NonNull};

    #[derive(Debug)]
    pub struct LinuxSharedMemory {
        ptr: NonNull<u8>,
        size: usize,
        fd: i32,
        path: PathBuf,
    }

    unsafe impl Send for LinuxSharedMemory {}
    unsafe impl Sync for LinuxSharedMemory {}

    impl LinuxSharedMemory {
        /// Create (or truncate) `/dev/shm/<name>` and map it read-write.
        pub fn create(size: usize, name: &str) -> io::Result<Self> {
            let path = PathBuf::from(format!("/dev/shm/{}", name));

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to create shared memory file at {}: {}", path.display(), e),
                    )
                })?;

            // Truncation zero-fills the region
            if unsafe { libc::ftruncate(file.as_raw_fd(), size as libc::off_t) } != 0 {
                let err = io::Error::last_os_error();
                let _ = fs::remove_file(&path);
                return Err(err);
            }

            // Keep the file descriptor alive
            let fd = file.into_raw_fd();

            // mmap hands back page-aligned memory, which covers the zone alignment
            let ptr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    fd,
                    0,
                )
            };

            if ptr == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                unsafe { libc::close(fd) };
                let _ = fs::remove_file(&path);
                tracing::warn!(path = %path.display(), size, error = %err, "shared memory mapping failed");
                return Err(err);
            }

            let ptr = match NonNull::new(ptr as *mut u8) {
                Some(ptr) => ptr,
                None => {
                    unsafe { libc::close(fd) };
                    let _ = fs::remove_file(&path);
                    return Err(io::Error::new(io::ErrorKind::Other, "mmap returned null"));
                }
            };

            Ok(Self {
                ptr,
                size,
                fd,
                path,
            })
        }
    }

    impl Drop for LinuxSharedMemory {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
                libc::close(self.fd);
            }
            let _ = fs::remove_file(&self.path);
        }
    }

    impl MemoryZone for LinuxSharedMemory {
        fn as_ptr(&self) -> *mut u8 {
            self.ptr.as_ptr()
        }

        fn size(&self) -> usize {
            self.size
        }

        fn raw_handle(&self) -> RawHandle {
            RawHandle::Fd(self.fd)
        }
    }
}
