use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Breaker type guarding the vision-model upstream; concrete so it can
/// live inside the service struct.
pub type VisionCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the circuit breaker for vision-model calls.
///
/// The extraction endpoint is a paid upstream with real latency, so a
/// broken or rate-limited key should fail fast instead of queueing
/// multi-second timeouts per upload.
///
/// - 3 consecutive failures open the circuit.
/// - Exponential backoff from 10s to 90s before a recovery probe.
///
/// Call through `failsafe::futures::CircuitBreaker` for async requests;
/// a rejected call surfaces as `failsafe::Error::Rejected` and is mapped
/// to an upstream-unavailable error by the caller.
pub fn create_vision_circuit_breaker() -> VisionCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(90), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(3, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn opens_after_three_failures() {
        let cb = create_vision_circuit_breaker();

        for _ in 0..3 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("upstream 500"));
            assert!(result.is_err());
        }

        // Circuit is now open and must reject without invoking the closure
        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        match result {
            Err(Error::Rejected) => {}
            _ => panic!("expected the open circuit to reject the call"),
        }
    }

    #[test]
    fn passes_successes_through() {
        let cb = create_vision_circuit_breaker();

        let result: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(7));
        assert_eq!(result.unwrap(), 7);

        // A success keeps the circuit closed for the next call
        let again: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(8));
        assert_eq!(again.unwrap(), 8);
    }
}
