/// Awaits `handler(item)` for every item the source produces, until the stop token is
/// cancelled. The first handler error ends the loop and is returned.
///
/// ```ignore
/// loop_with_stop!(
///     "monitor tick timer", stop_rx,
///     trigger.tick() => ticker.tick(it)
/// )
/// ```
///
/// `it` stands for the produced item, any other identifier is passed through as is and
/// `(&x)` passes a reference. Must be the tail of a function returning `anyhow::Result<()>`.
#[macro_export]
macro_rules! loop_with_stop {

(arg $item:ident on it) => {
    $item
};
(arg $_unused:ident on $arg:ident) => {
    $arg
};
(arg $_unused:ident on (&$arg:ident)) => {
    &$arg
};

($task_name:expr, $stop_rx:ident, $source:ident.$op:ident() => $($calls:ident).+($($params:tt),*)) => {
    loop {
        tokio::select! {
            biased; // stopping wins over new work
            _ = $stop_rx.cancelled() => {
                log::debug!("{} received the stop signal.", $task_name);
                return anyhow::Result::Ok(());
            }
            item = $source.$op() => {
                $($calls).+($($crate::loop_with_stop!(arg item on $params)),*).await?;
            }
        }
    }
};
}
