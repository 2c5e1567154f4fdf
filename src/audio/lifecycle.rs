//! One-shot engine session: load, initialize, open slot, run, then release
//! everything in reverse.

use super::backend::EngineLoader;
use super::engine::{EngineHandle, PlaybackSlot};
use super::error::{InitializationError, LoadError, SlotError};
use super::params::{EngineVersion, InitParams};
use tracing::warn;

/// Slot used by every run.
pub const DEFAULT_SLOT: i32 = 0;

/// How far a run got once the library was loaded.
#[derive(Debug)]
pub enum SessionOutcome<T> {
    /// The slot was opened and `work` ran. Its result is in `output`.
    Completed { version: EngineVersion, output: T },
    /// The engine was initialized but refused to open the slot.
    SlotUnavailable {
        version: EngineVersion,
        error: SlotError,
    },
    /// The engine refused to initialize. Only unloading happened after.
    InitializationFailed(InitializationError),
}

impl<T> SessionOutcome<T> {
    /// The work result, if the run got that far.
    pub fn output(self) -> Option<T> {
        match self {
            Self::Completed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs `work` against slot `slot_index` of a freshly loaded engine.
///
/// Steps, each only if the previous acquisition succeeded:
/// load, initialize, open slot, `work`, close slot, deinitialize, unload.
/// Release happens in strict reverse order whatever `work` returns.
///
/// # Errors
///
/// Only a load failure is an error; nothing was acquired in that case.
/// Every later failure is reported through [`SessionOutcome`].
pub fn run_session<L, T, F>(
    loader: &L,
    params: &InitParams,
    slot_index: i32,
    work: F,
) -> Result<SessionOutcome<T>, LoadError>
where
    L: EngineLoader,
    F: FnOnce(&mut PlaybackSlot<'_, L::Backend>) -> T,
{
    let mut handle = EngineHandle::load(loader)?;

    let outcome = match handle.initialize(params) {
        Ok(mut session) => {
            let version = session.version();
            let outcome = match session.open_slot(slot_index) {
                Ok(mut slot) => {
                    let output = work(&mut slot);
                    slot.close();
                    SessionOutcome::Completed { version, output }
                }
                Err(error) => {
                    warn!("{}", error);
                    SessionOutcome::SlotUnavailable { version, error }
                }
            };
            session.deinitialize();
            outcome
        }
        Err(e) => {
            warn!("{}", e);
            SessionOutcome::InitializationFailed(e)
        }
    };

    handle.unload();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{Call, MockLoader};

    fn default_init() -> Call {
        Call::Init {
            config: None,
            sample_rate: 44100,
            channels: 2,
            flags: 0,
        }
    }

    #[test]
    fn test_full_sequence_in_order() {
        let loader = MockLoader::new();
        let outcome = run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ()).unwrap();

        match outcome {
            SessionOutcome::Completed { version, .. } => assert_eq!(version.raw(), 5),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            loader.calls(),
            vec![
                Call::Load,
                default_init(),
                Call::OpenSlot(0),
                Call::CloseSlot(0),
                Call::Deinit,
                Call::Unload,
            ]
        );
    }

    #[test]
    fn test_load_failure_skips_everything() {
        let loader = MockLoader::failing();
        let mut ran = false;
        let result = run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ran = true);

        assert!(matches!(result, Err(LoadError::NoCandidates)));
        assert!(!ran);
        assert_eq!(loader.calls(), vec![Call::Load]);
        assert_eq!(loader.count(&Call::Unload), 0);
    }

    #[test]
    fn test_init_failure_still_unloads() {
        let loader = MockLoader::new().with_init_status(-1);
        let mut ran = false;
        let outcome =
            run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ran = true).unwrap();

        assert!(matches!(
            outcome,
            SessionOutcome::InitializationFailed(InitializationError::Rejected { code: -1 })
        ));
        assert!(!ran);
        assert_eq!(loader.calls(), vec![Call::Load, default_init(), Call::Unload]);
        assert_eq!(loader.count(&Call::OpenSlot(0)), 0);
        assert_eq!(loader.count(&Call::CloseSlot(0)), 0);
        assert_eq!(loader.count(&Call::Deinit), 0);
    }

    #[test]
    fn test_zero_version_counts_as_success() {
        let loader = MockLoader::new().with_init_status(0);
        let outcome = run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ()).unwrap();

        assert!(matches!(outcome, SessionOutcome::Completed { .. }));
        assert_eq!(loader.count(&Call::Deinit), 1);
    }

    #[test]
    fn test_slot_unavailable_releases_in_order() {
        let loader = MockLoader::new().with_open_status(-1);
        let mut ran = false;
        let outcome =
            run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ran = true).unwrap();

        assert!(matches!(outcome, SessionOutcome::SlotUnavailable { .. }));
        assert!(!ran);
        assert_eq!(
            loader.calls(),
            vec![
                Call::Load,
                default_init(),
                Call::OpenSlot(0),
                Call::CloseSlot(0),
                Call::Deinit,
                Call::Unload,
            ]
        );
    }

    #[test]
    fn test_work_runs_between_open_and_close() {
        let loader = MockLoader::new();
        let outcome = run_session(
            &loader,
            &InitParams::default(),
            DEFAULT_SLOT,
            |slot| -> Result<(), SlotError> {
                slot.load("song.sunvox")?;
                slot.play_from_beginning()?;
                slot.stop()
            },
        )
        .unwrap();

        assert!(outcome.output().unwrap().is_ok());
        assert_eq!(
            loader.calls(),
            vec![
                Call::Load,
                default_init(),
                Call::OpenSlot(0),
                Call::SongLoad(0, b"song.sunvox".to_vec()),
                Call::PlayFromBeginning(0),
                Call::Stop(0),
                Call::CloseSlot(0),
                Call::Deinit,
                Call::Unload,
            ]
        );
    }

    #[test]
    fn test_failed_work_still_releases() {
        let loader = MockLoader::new().with_load_status(-4);
        let outcome = run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |slot| {
            slot.load("broken.sunvox")
        })
        .unwrap();

        let err = outcome.output().unwrap().unwrap_err();
        assert!(matches!(err, SlotError::Engine { code: -4, .. }));
        let calls = loader.calls();
        assert_eq!(
            &calls[calls.len() - 3..],
            &[Call::CloseSlot(0), Call::Deinit, Call::Unload]
        );
    }

    #[test]
    fn test_each_step_runs_at_most_once() {
        let loader = MockLoader::new();
        run_session(&loader, &InitParams::default(), DEFAULT_SLOT, |_| ()).unwrap();

        for call in [
            Call::Load,
            default_init(),
            Call::OpenSlot(0),
            Call::CloseSlot(0),
            Call::Deinit,
            Call::Unload,
        ] {
            assert_eq!(loader.count(&call), 1, "{:?}", call);
        }
    }
}
