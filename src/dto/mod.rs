pub mod screening_dto;
