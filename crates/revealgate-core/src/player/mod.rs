mod autoplay;

pub use autoplay::{
    AutoplayController, AutoplayHandle, AutoplayState, MediaEvent, MediaPlayer, PlayFuture,
    RETRY_DELAY_MS,
};
