mod cart_pole;
mod errors;
mod mountain_car;
mod registry;
mod time_limit;
mod traits;
mod types;

pub use cart_pole::CartPole;
pub use errors::EnvError;
pub use mountain_car::MountainCar;
pub use registry::{MakeOptions, REGISTERED, make};
pub use time_limit::TimeLimit;
pub use traits::{BoxedEnv, Env};
pub use types::{EnvMetadata, RenderMode, Space, Transition};
