mod article;
mod user;

pub use article::{
    Article, ArticleDraft, ArticleListItem, ArticleUpdate, ArticleWithAuthor, CelebrationTarget,
    NewArticle, PendingSummary,
};
pub use user::{Identity, User};
