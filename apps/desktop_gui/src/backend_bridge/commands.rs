//! Backend commands queued from UI to backend worker.

pub enum BackendCommand {
    ReloadDirectory,
    SignUp { activity: String, email: String },
    Unregister { activity: String, email: String },
}
