//! Platform capability detection.
//!
//! Mobile-like runtimes cannot open arbitrary local-network sockets and
//! cannot consume chunked bodies incrementally. The client checks these
//! capabilities before touching the network: the local-server provider is
//! rejected outright on restricted platforms, and streaming falls back to
//! a buffered call when incremental reads are unavailable.

/// What the host platform allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Can open sockets to arbitrary local-network addresses.
    pub local_network: bool,
    /// Can read chunked response bodies incrementally.
    pub native_streaming: bool,
}

impl PlatformCapabilities {
    /// Detect the capabilities of the compile target.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "ios", target_os = "android")) {
            Self::restricted()
        } else {
            Self::desktop()
        }
    }

    /// Full capabilities (desktop-like).
    pub const fn desktop() -> Self {
        Self {
            local_network: true,
            native_streaming: true,
        }
    }

    /// Mobile-like restricted runtime.
    pub const fn restricted() -> Self {
        Self {
            local_network: false,
            native_streaming: false,
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}
