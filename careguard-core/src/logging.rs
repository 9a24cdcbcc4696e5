// Optional logging. With the `log` feature these forward to the `log`
// facade; without it they expand to nothing so `no_std` builds carry no
// formatting code.

#[cfg(feature = "log")]
macro_rules! cg_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! cg_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! cg_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! cg_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! cg_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! cg_warn {
    ($($arg:tt)*) => {};
}
