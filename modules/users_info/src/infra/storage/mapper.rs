use crate::contract::model::User;
use crate::infra::storage::entity::UserDoc;

pub fn entity_to_contract(doc: UserDoc) -> User {
    User {
        id: doc.id,
        name: doc.name,
        email: doc.email,
        created_time: doc.created_time,
        updated_time: doc.updated_time,
    }
}
