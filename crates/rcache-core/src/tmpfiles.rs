//! Pending temp files and fatal-signal cleanup.
//!
//! Temp files (preprocessed output, captured stdout/stderr) must disappear
//! even when the build system kills the wrapper mid-compile. The registry is
//! a grow-only linked list of leaked nodes so the signal handler can walk it
//! without allocating or locking; entries are deactivated, never freed. The
//! list head is only swapped with fatal signals blocked.
//!
//! Handler protocol on a fatal signal: restore the default disposition,
//! forward SIGTERM to a live child compiler, unlink every active entry,
//! wait for the child, then re-raise.

use std::path::Path;

#[cfg(unix)]
mod imp {
    use std::ffi::CString;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

    struct Node {
        path: CString,
        active: AtomicBool,
        next: *mut Node,
    }

    static HEAD: AtomicPtr<Node> = AtomicPtr::new(std::ptr::null_mut());
    static CHILD_PID: AtomicI32 = AtomicI32::new(0);

    const FATAL_SIGNALS: [libc::c_int; 4] =
        [libc::SIGINT, libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT];

    fn block_fatal_signals() -> libc::sigset_t {
        // Safety: sigemptyset/sigaddset/pthread_sigmask with valid,
        // stack-local sets.
        unsafe {
            let mut set: libc::sigset_t = std::mem::zeroed();
            let mut old: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut set);
            for sig in FATAL_SIGNALS {
                libc::sigaddset(&mut set, sig);
            }
            libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut old);
            old
        }
    }

    fn restore_signals(old: &libc::sigset_t) {
        // Safety: restoring a mask previously returned by pthread_sigmask.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, old, std::ptr::null_mut());
        }
    }

    pub fn register(path: &Path) {
        let Ok(cstr) = CString::new(path.as_os_str().as_encoded_bytes()) else {
            return;
        };
        let node = Box::into_raw(Box::new(Node {
            path: cstr,
            active: AtomicBool::new(true),
            next: std::ptr::null_mut(),
        }));
        let old_mask = block_fatal_signals();
        // Safety: node was just allocated and is not yet shared.
        unsafe {
            (*node).next = HEAD.load(Ordering::Relaxed);
        }
        HEAD.store(node, Ordering::SeqCst);
        restore_signals(&old_mask);
    }

    pub fn unregister(path: &Path) {
        let bytes = path.as_os_str().as_encoded_bytes();
        let mut cursor = HEAD.load(Ordering::SeqCst);
        while !cursor.is_null() {
            // Safety: nodes are leaked, so the pointer stays valid forever.
            let node = unsafe { &*cursor };
            if node.active.load(Ordering::SeqCst) && node.path.as_bytes() == bytes {
                node.active.store(false, Ordering::SeqCst);
                return;
            }
            cursor = node.next;
        }
    }

    pub fn cleanup_pending() {
        let mut cursor = HEAD.load(Ordering::SeqCst);
        while !cursor.is_null() {
            // Safety: see unregister.
            let node = unsafe { &*cursor };
            if node.active.swap(false, Ordering::SeqCst) {
                // Safety: unlink(2) on a NUL-terminated path;
                // async-signal-safe.
                unsafe {
                    libc::unlink(node.path.as_ptr());
                }
            }
            cursor = node.next;
        }
    }

    pub fn set_child_pid(pid: u32) {
        CHILD_PID.store(pid as i32, Ordering::SeqCst);
    }

    pub fn clear_child_pid() {
        CHILD_PID.store(0, Ordering::SeqCst);
    }

    extern "C" fn fatal_signal_handler(signum: libc::c_int) {
        // Safety: every call below (signal, kill, waitpid, unlink, raise)
        // is async-signal-safe; no allocation or locking happens here.
        unsafe {
            libc::signal(signum, libc::SIG_DFL);

            let child = CHILD_PID.load(Ordering::SeqCst);
            if signum == libc::SIGTERM && child > 0 {
                libc::kill(child, signum);
            }

            cleanup_pending();

            if child > 0 {
                let mut status = 0;
                libc::waitpid(child, &mut status, 0);
            }

            libc::raise(signum);
        }
    }

    pub fn install_handlers() {
        // Safety: installing a handler that only uses async-signal-safe
        // calls; sigaction with a zeroed, then initialized struct.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = fatal_signal_handler as *const () as usize;
            libc::sigemptyset(&mut action.sa_mask);
            for sig in FATAL_SIGNALS {
                libc::sigaddset(&mut action.sa_mask, sig);
            }
            for sig in FATAL_SIGNALS {
                libc::sigaction(sig, &action, std::ptr::null_mut());
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

    pub fn register(path: &Path) {
        if let Ok(mut pending) = PENDING.lock() {
            pending.push(path.to_path_buf());
        }
    }

    pub fn unregister(path: &Path) {
        if let Ok(mut pending) = PENDING.lock() {
            pending.retain(|p| p != path);
        }
    }

    pub fn cleanup_pending() {
        if let Ok(mut pending) = PENDING.lock() {
            for path in pending.drain(..) {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    pub fn set_child_pid(_pid: u32) {}
    pub fn clear_child_pid() {}
    pub fn install_handlers() {}
}

/// Track a temp file for removal on fatal signals and at exit.
pub fn register(path: &Path) {
    imp::register(path);
}

/// Stop tracking a file, typically because it was renamed into place.
pub fn unregister(path: &Path) {
    imp::unregister(path);
}

/// Remove every still-registered temp file.
pub fn cleanup_pending() {
    imp::cleanup_pending();
}

pub fn set_child_pid(pid: u32) {
    imp::set_child_pid(pid);
}

pub fn clear_child_pid() {
    imp::clear_child_pid();
}

/// Install the fatal-signal handlers. Call once, early.
pub fn install_handlers() {
    imp::install_handlers();
}
