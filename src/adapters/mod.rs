//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter          | Implements      | Connects to                     |
//! |------------------|-----------------|---------------------------------|
//! | `sim_output`     | OutputSink      | Log only (development machines) |
//! | `hal_output`     | OutputSink      | `embedded-hal` relays / PWM     |
//! | `log_sink`       | ChangeNotifier  | Log output                      |
//! | `queue_notifier` | ChangeNotifier  | Per-observer bounded queues     |

pub mod hal_output;
pub mod log_sink;
pub mod queue_notifier;
pub mod sim_output;

pub use hal_output::{PwmBank, RelayBank};
pub use log_sink::LogNotifier;
pub use queue_notifier::{ObserverHandle, ObserverMessage, QueueNotifier};
pub use sim_output::SimulatedOutput;
