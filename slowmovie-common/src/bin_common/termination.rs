use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use signal_hook::{consts::signal::*, low_level};

/// Cheap to clone handle on whether a termination signal has arrived. The
/// player polls this between blocking steps so the panel can be put away
/// properly; a second signal gives up on that and falls through to the
/// default handler, killing the process.
#[derive(Clone, Debug)]
pub struct Cookie {
    signals: Arc<AtomicUsize>,
}

impl Cookie {
    pub fn new() -> Result<Self, std::io::Error> {
        let signals = Arc::new(AtomicUsize::new(0));
        register_termination_handler(SIGINT, &signals)?;
        register_termination_handler(SIGTERM, &signals)?;
        Ok(Self { signals })
    }

    pub fn is_terminating(&self) -> bool {
        self.signals.load(Ordering::SeqCst) >= 1
    }
}

fn register_termination_handler(
    signal: i32,
    signals: &Arc<AtomicUsize>,
) -> Result<(), std::io::Error> {
    let signals = Arc::clone(signals);
    // SAFETY: the handler only touches an atomic and calls functions
    // signal-hook itself uses in signal handlers
    unsafe {
        low_level::register(signal, move || {
            let previous = signals.fetch_add(1, Ordering::SeqCst);
            if previous >= 1 {
                let _ = low_level::emulate_default_handler(signal);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_signal_flips_the_cookie() {
        let cookie = Cookie::new().unwrap();
        assert!(!cookie.is_terminating());

        // one signal is observed, not acted on, so the test process survives
        low_level::raise(SIGTERM).unwrap();
        assert!(cookie.is_terminating());
        assert!(cookie.clone().is_terminating());
    }
}
