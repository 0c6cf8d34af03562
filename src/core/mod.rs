pub mod dispatch;
pub mod error;
pub mod finality;
pub mod outcome;
pub mod request;
pub mod session;
pub mod template;

pub use dispatch::{dispatch, prepare, Dispatched};
pub use error::{CallError, EngineError, ErrorKind};
pub use finality::{Delivery, Epoch, FinalitySnapshot, FinalityState, FinalityTracker};
pub use outcome::{
    CallbackResult, ExecutionOutcome, OutcomeError, SubmittedTransaction, Subscription,
    TransactionHandle, TransactionWatch, Unsubscribe,
};
pub use request::{
    callback, ChainContext, CoercedArgs, CoercedArgument, ExecutionCallback, ExecutionRequest,
    OperationKind, Signer, UserOperation, WalletProvider,
};
pub use session::{DisplayView, EditorSession};
pub use template::{
    AuxBuilder, AuxSource, Catalog, EditorProfile, ImportedTemplate, Template, TemplateGroup,
};
