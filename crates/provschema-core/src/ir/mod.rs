pub mod metadata;
pub mod provider;
pub mod types;

pub use metadata::{CrudOperations, CrudSlot, ProviderMetadata};
pub use provider::{FunctionSpec, ProviderSchema, ResourceSpec, ReturnTypeSpec};
pub use types::{
    ANY_TYPE_REF, ComplexTypeSpec, DiscriminatorSpec, EnumTypeSpec, EnumValueSpec, ObjectTypeSpec,
    PrimitiveType, PropertySpec, TypeSpec, type_ref,
};
