pub mod amount;
pub mod calc;
pub mod csv;
pub mod engine;
pub mod model;
pub mod settings;
pub mod snapshot;
pub mod validation;

pub use amount::{Amount, PositiveAmount};
pub use calc::{
    CalculationCache, CalculationSummary, calculate_member_balances, calculate_minimal_settlements,
    calculate_payment_split,
};
pub use engine::{ActionError, PaymentUpdate, Warikan, WarikanState};
pub use model::{Action, BalanceStatus, Member, MemberBalance, MemberId, Payment, PaymentId, Settlement};
pub use settings::Settings;
pub use validation::{Limits, ValidationError, ValidationErrors};
