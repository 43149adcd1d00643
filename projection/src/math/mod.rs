pub mod randomvariable;
