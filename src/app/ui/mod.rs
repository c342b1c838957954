mod document;
mod panels;
