//! Data models for Libris

pub mod author;
pub mod book;
pub mod category;
pub mod copy;
pub mod fee;
pub mod loan;
pub mod member;
pub mod principal;
pub mod reservation;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails};
pub use category::Category;
pub use copy::{BookCopy, CopyStatus};
pub use fee::{FeeKind, FeeType, MemberBalance, Payment, Transaction, TransactionStatus};
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use member::Member;
pub use principal::{Principal, Role};
pub use reservation::{Reservation, ReservationStatus};
