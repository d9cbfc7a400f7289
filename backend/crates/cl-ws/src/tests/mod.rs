mod handler_table;
