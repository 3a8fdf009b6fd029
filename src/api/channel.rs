/// Cancellation for one fetch concern. Issuing a new token invalidates
/// every earlier one, so the response belonging to a superseded request
/// can be recognized and dropped before it mutates state.
///
/// The engine runs in a single execution context, so a plain counter is
/// enough; there is no cross-thread signalling to do.
#[derive(Debug, Default)]
pub struct FetchChannel {
    generation: u64,
}

/// Handle tied to one in-flight request. Dead once its channel issues a
/// newer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchToken {
    generation: u64,
}

impl FetchChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request on this channel, cancelling any predecessor.
    pub fn issue(&mut self) -> FetchToken {
        self.generation += 1;
        FetchToken {
            generation: self.generation,
        }
    }

    /// Whether `token` still belongs to the newest request.
    pub fn is_live(&self, token: &FetchToken) -> bool {
        token.generation == self.generation
    }

    /// Invalidate every outstanding token without starting a new request.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }
}
