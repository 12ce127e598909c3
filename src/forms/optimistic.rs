//! Local-first mutations with an explicit rollback path

use async_trait::async_trait;

use super::Notice;
use crate::error::Result;

/// A mutation applied to local state before the backend confirms it
#[async_trait]
pub trait OptimisticCommand: Send + Sync {
    type State: Send;

    fn apply(&self, state: &mut Self::State);

    /// Undo [`apply`](Self::apply)
    fn revert(&self, state: &mut Self::State);

    /// Send the mutation to the backend
    async fn commit(&self) -> Result<()>;

    /// Short description used in the rollback notice
    fn describe(&self) -> String;
}

/// A command whose local effect is visible and whose commit is outstanding
#[must_use = "an applied command must be settled"]
pub struct Pending<C: OptimisticCommand> {
    command: C,
}

impl<C: OptimisticCommand> Pending<C> {
    /// Apply `command` to `state` immediately
    pub fn start(command: C, state: &mut C::State) -> Self {
        command.apply(state);
        Self { command }
    }

    /// Commit; on failure revert `state` and return a transient notice
    pub async fn settle(self, state: &mut C::State) -> Option<Notice> {
        match self.command.commit().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "rolling back {}", self.command.describe());
                self.command.revert(state);
                Some(Notice::transient(format!(
                    "Could not {}: {}",
                    self.command.describe(),
                    e.user_message()
                )))
            }
        }
    }
}

/// Apply, commit, and roll back on failure
pub async fn run_optimistic<C: OptimisticCommand>(
    command: C,
    state: &mut C::State,
) -> Option<Notice> {
    Pending::start(command, state).settle(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Increment {
        fail: bool,
    }

    #[async_trait]
    impl OptimisticCommand for Increment {
        type State = i32;

        fn apply(&self, state: &mut i32) {
            *state += 1;
        }

        fn revert(&self, state: &mut i32) {
            *state -= 1;
        }

        async fn commit(&self) -> Result<()> {
            if self.fail {
                Err(Error::Validation("backend said no".to_string()))
            } else {
                Ok(())
            }
        }

        fn describe(&self) -> String {
            "increment the counter".to_string()
        }
    }

    #[tokio::test]
    async fn state_changes_before_commit() {
        let mut counter = 0;
        let pending = Pending::start(Increment { fail: false }, &mut counter);
        assert_eq!(counter, 1);
        assert!(pending.settle(&mut counter).await.is_none());
        assert_eq!(counter, 1);
    }

    #[tokio::test]
    async fn failed_commit_reverts_and_notifies() {
        let mut counter = 0;
        let notice = run_optimistic(Increment { fail: true }, &mut counter).await.unwrap();
        assert_eq!(counter, 0);
        assert_eq!(notice.message, "Could not increment the counter: backend said no");
    }
}
