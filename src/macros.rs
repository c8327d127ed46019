/// Join a collection into a human-readable string, formatting each item with
/// `$fmt` first. Handy in `Debug`/tracing impls across the allocator.
#[macro_export]
macro_rules! connect {
    ($items:expr, $fmt:expr, $connector:expr) => {
        $items
            .iter()
            .map(|t| format!($fmt, t))
            .collect::<Vec<_>>()
            .join($connector)
    };
}
