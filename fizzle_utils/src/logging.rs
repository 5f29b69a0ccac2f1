/// Panics in debug builds, logs an error in release builds.
///
/// Used for caller sequencing mistakes that should be loud while developing
/// but must never take down a running render loop.
#[macro_export]
macro_rules! debug_panic {
    () => ( if cfg!(debug_assertions) { panic!(); } );
    ($($arg:tt)*) => ( if cfg!(debug_assertions) { panic!($($arg)*); } else { $crate::tracing::error!($($arg)*); } );
}
