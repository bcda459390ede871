//! Adaptive: switches between sequential and combinatorial based on the
//! recent order-creation rate.
//!
//! Per the preserved open question, the rate window is measured against
//! `order_creation` times (`recent_order_times`), not the time orders
//! actually reach the pending queue — these can differ after a large
//! master-list jump, and that discrepancy is kept rather than "fixed".

use super::{combinatorial, sequential, DispatchArgs};

pub fn run(args: &mut DispatchArgs<'_>) -> f64 {
    let window_start = args.current_time + (-args.config.combinatorial_window_mins);
    let recent_count = args.recent_order_times.iter().filter(|&&t| t >= window_start).count();
    let order_rate = recent_count as f64 / args.config.combinatorial_window_mins;

    if order_rate >= args.config.high_load_threshold {
        combinatorial::run(args)
    } else {
        sequential::run(args)
    }
}
